//! Concrete collection and global definitions for the provider directory.
//!
//! | Slug | Title field | Hooks | Versions |
//! |------|-------------|-------|----------|
//! | `providers` | `name` | yes | - |
//! | `resources` | `title` | no | - |
//! | `blog` | `title` | yes | drafts |
//! | `pdf-library` | `title` | yes | max 50 per doc |
//! | `tags` | `name` | no | - |
//! | `faqs` | `question` | no | - |
//! | `site-settings` (global) | - | yes | - |

use serde_json::json;

use crate::schema::{
    AccessPolicy, CollectionSchema, Field, GlobalSchema, ReadAccess, Versioning,
};

pub const PROVIDERS: &str = "providers";
pub const RESOURCES: &str = "resources";
pub const BLOG: &str = "blog";
pub const PDF_LIBRARY: &str = "pdf-library";
pub const TAGS: &str = "tags";
pub const FAQS: &str = "faqs";
pub const SITE_SETTINGS: &str = "site-settings";

fn public_read() -> AccessPolicy {
    AccessPolicy {
        read: ReadAccess::Public,
    }
}

fn service_rows(name: &'static str) -> Field {
    Field::array(name, vec![Field::text("service")])
}

pub fn providers() -> CollectionSchema {
    CollectionSchema {
        slug: PROVIDERS,
        title_field: "name",
        description: "HIV service providers in the Middlesex-Somerset-Hunterdon area",
        fields: vec![
            Field::text("name").required().unique(),
            Field::text("slug").required().unique(),
            Field::textarea("description").required(),
            Field::select(
                "type",
                &[
                    ("FQHC (Federally Qualified Health Center)", "FQHC"),
                    ("Hospital", "Hospital"),
                    ("Community Organization", "Community"),
                    ("Mental Health Center", "Mental Health"),
                    ("Substance Abuse Center", "Substance Abuse"),
                    ("Other", "Other"),
                ],
            ),
            Field::group(
                "location",
                vec![
                    Field::text("address").required(),
                    Field::text("city").required(),
                    Field::text("state").default_value(json!("NJ")),
                    Field::text("zipCode").required(),
                    Field::select(
                        "county",
                        &[
                            ("Middlesex", "middlesex"),
                            ("Somerset", "somerset"),
                            ("Hunterdon", "hunterdon"),
                        ],
                    )
                    .required(),
                ],
            ),
            Field::group(
                "contact",
                vec![
                    Field::text("phone").required(),
                    Field::text("phone24hr"),
                    Field::text("fax"),
                    Field::email("email"),
                    Field::text("website"),
                ],
            ),
            Field::group(
                "hours",
                vec![
                    Field::text("monday"),
                    Field::text("tuesday"),
                    Field::text("wednesday"),
                    Field::text("thursday"),
                    Field::text("friday"),
                    Field::text("saturday"),
                    Field::text("sunday"),
                ],
            ),
            Field::group(
                "services",
                vec![
                    service_rows("medical"),
                    service_rows("support"),
                    service_rows("prevention"),
                ],
            ),
            Field::array("eligibility", vec![Field::text("requirement")]),
            Field::checkbox("ryanWhite").default_value(json!(false)),
            Field::select(
                "ryanWhiteParts",
                &[
                    ("Part A", "A"),
                    ("Part B", "B"),
                    ("Part C", "C"),
                    ("Part D", "D"),
                ],
            )
            .has_many(),
            Field::array("languages", vec![Field::text("language")]),
            Field::array("accessibility", vec![Field::text("feature")]),
            Field::array("insurance", vec![Field::text("plan")]),
            Field::group(
                "coordinates",
                vec![
                    Field::number("lat").required(),
                    Field::number("lng").required(),
                ],
            ),
            Field::select(
                "status",
                &[
                    ("Active", "active"),
                    ("Inactive", "inactive"),
                    ("Pending", "pending"),
                ],
            )
            .required()
            .default_value(json!("active")),
        ],
        access: public_read(),
        hooks_enabled: true,
        versions: None,
        slug_source: Some("name"),
    }
}

fn language_select() -> Field {
    Field::select(
        "language",
        &[
            ("English", "english"),
            ("Spanish", "spanish"),
            ("Both", "both"),
        ],
    )
    .required()
    .default_value(json!("english"))
}

fn published_only() -> AccessPolicy {
    AccessPolicy {
        read: ReadAccess::AuthenticatedOrFieldEquals {
            field: "status",
            value: "published",
        },
    }
}

/// Downloadable guides and external links. Categories are free text.
pub fn resources() -> CollectionSchema {
    CollectionSchema {
        slug: RESOURCES,
        title_field: "title",
        description: "Educational materials, guides, and external links",
        fields: vec![
            Field::text("title").required(),
            Field::text("slug").required().unique(),
            Field::textarea("description").required(),
            Field::text("category").required(),
            Field::upload("pdfFile", "media"),
            Field::text("externalLink"),
            language_select(),
            Field::checkbox("featured").default_value(json!(false)),
            Field::date("publishedDate").required(),
            Field::relationship("tags", TAGS).has_many(),
            Field::select("status", &[("Draft", "draft"), ("Published", "published")])
                .required()
                .default_value(json!("draft")),
        ],
        access: published_only(),
        hooks_enabled: false,
        versions: None,
        slug_source: Some("title"),
    }
}

pub fn blog() -> CollectionSchema {
    CollectionSchema {
        slug: BLOG,
        title_field: "title",
        description: "Blog posts, news, and updates",
        fields: vec![
            Field::text("title").required(),
            Field::text("slug").required().unique(),
            Field::text("author")
                .required()
                .default_value(json!("HIV Connect Central NJ")),
            Field::date("publishedDate").required(),
            Field::upload("featuredImage", "media"),
            Field::textarea("excerpt").required().max_length(200),
            Field::rich_text("content").required(),
            Field::select(
                "category",
                &[
                    ("News", "news"),
                    ("Events", "events"),
                    ("Updates", "updates"),
                    ("Success Stories", "stories"),
                    ("Community", "community"),
                ],
            )
            .required(),
            Field::relationship("tags", TAGS).has_many(),
            language_select(),
            Field::select(
                "status",
                &[
                    ("Draft", "draft"),
                    ("Published", "published"),
                    ("Archived", "archived"),
                ],
            )
            .required()
            .default_value(json!("draft")),
        ],
        access: published_only(),
        hooks_enabled: true,
        versions: Some(Versioning {
            drafts: true,
            max_per_doc: None,
        }),
        slug_source: Some("title"),
    }
}

pub fn pdf_library() -> CollectionSchema {
    CollectionSchema {
        slug: PDF_LIBRARY,
        title_field: "title",
        description: "Versioned PDF document management",
        fields: vec![
            Field::text("title").required(),
            Field::upload("file", "media").required(),
            Field::textarea("description"),
            Field::text("versionNumber").required(),
            Field::select(
                "category",
                &[
                    ("Forms", "forms"),
                    ("Reports", "reports"),
                    ("Guides", "guides"),
                    ("Policies", "policies"),
                    ("Bylaws", "bylaws"),
                    ("Other", "other"),
                ],
            )
            .required(),
            Field::select("status", &[("Current", "current"), ("Archived", "archived")])
                .required()
                .default_value(json!("current")),
        ],
        access: AccessPolicy {
            read: ReadAccess::AuthenticatedOrFieldEquals {
                field: "status",
                value: "current",
            },
        },
        hooks_enabled: true,
        versions: Some(Versioning {
            drafts: false,
            max_per_doc: Some(50),
        }),
        slug_source: None,
    }
}

pub fn tags() -> CollectionSchema {
    CollectionSchema {
        slug: TAGS,
        title_field: "name",
        description: "Tags for organizing resources and blog posts",
        fields: vec![
            Field::text("name").required().unique(),
            Field::text("slug").required().unique(),
        ],
        access: public_read(),
        hooks_enabled: false,
        versions: None,
        slug_source: Some("name"),
    }
}

pub fn faqs() -> CollectionSchema {
    CollectionSchema {
        slug: FAQS,
        title_field: "question",
        description: "Frequently asked questions",
        fields: vec![
            Field::text("question").required(),
            Field::rich_text("answer").required(),
            Field::select(
                "category",
                &[
                    ("General", "general"),
                    ("Testing", "testing"),
                    ("Treatment", "treatment"),
                    ("Services", "services"),
                    ("Planning Council", "planning-council"),
                ],
            )
            .required(),
            Field::number("order"),
            Field::select(
                "language",
                &[("English", "english"), ("Spanish", "spanish")],
            )
            .default_value(json!("english")),
            Field::select("status", &[("Draft", "draft"), ("Published", "published")])
                .default_value(json!("draft")),
        ],
        access: published_only(),
        hooks_enabled: false,
        versions: None,
        slug_source: None,
    }
}

fn nav_link_fields() -> Vec<Field> {
    vec![
        Field::text("label").required(),
        Field::text("url").required(),
        Field::number("order"),
        Field::checkbox("openInNewTab").default_value(json!(false)),
    ]
}

pub const DEFAULT_SITE_NAME: &str = "HIV Connect Central NJ";

pub fn site_settings() -> GlobalSchema {
    let mut navigation_fields = nav_link_fields();
    navigation_fields.push(Field::array("children", nav_link_fields()));

    GlobalSchema {
        slug: SITE_SETTINGS,
        fields: vec![
            Field::text("siteName")
                .required()
                .default_value(json!(DEFAULT_SITE_NAME)),
            Field::text("hotlineNumber").required(),
            Field::upload("logo", "media"),
            Field::group(
                "socialMedia",
                vec![
                    Field::text("facebook"),
                    Field::text("twitter"),
                    Field::text("instagram"),
                    Field::text("linkedin"),
                ],
            ),
            Field::email("contactEmail").required(),
            Field::checkbox("maintenanceMode").default_value(json!(false)),
            Field::textarea("maintenanceMessage"),
            Field::array(
                "footerLinks",
                vec![
                    Field::text("label").required(),
                    Field::text("url").required(),
                    Field::checkbox("openInNewTab").default_value(json!(false)),
                ],
            ),
            Field::array("navigation", navigation_fields),
        ],
        hooks_enabled: true,
    }
}

/// Every collection, in migration order.
pub fn all() -> Vec<CollectionSchema> {
    vec![providers(), resources(), blog(), pdf_library(), tags(), faqs()]
}

pub fn globals() -> Vec<GlobalSchema> {
    vec![site_settings()]
}

pub fn find(slug: &str) -> Option<CollectionSchema> {
    all().into_iter().find(|c| c.slug == slug)
}

pub fn find_watched_global(slug: &str) -> Option<GlobalSchema> {
    globals()
        .into_iter()
        .find(|g| g.slug == slug && g.hooks_enabled)
}

/// Print a summary table of configured collections and globals.
pub fn list_collections() {
    println!(
        "{:<16} {:<12} {:<8} {:<10} {:<18} DESCRIPTION",
        "COLLECTION", "TITLE", "HOOKS", "VERSIONS", "READ"
    );
    for c in all() {
        let versions = match &c.versions {
            Some(v) if v.drafts => "drafts".to_string(),
            Some(v) => match v.max_per_doc {
                Some(max) => format!("max {}", max),
                None => "yes".to_string(),
            },
            None => "-".to_string(),
        };
        println!(
            "{:<16} {:<12} {:<8} {:<10} {:<18} {}",
            c.slug,
            c.title_field,
            c.hooks_enabled,
            versions,
            c.access.read.to_string(),
            c.description
        );
    }
    for g in globals() {
        println!(
            "{:<16} {:<12} {:<8} {:<10} {:<18} global",
            g.slug, "-", g.hooks_enabled, "-", "public"
        );
    }
}
