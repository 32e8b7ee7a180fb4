//! Schema contract for CMS-managed records.
//!
//! The CMS derives storage, validation, and REST routes from declarative
//! collection definitions. This module describes the same definitions as
//! Rust data so our tooling can default and validate records before they
//! are sent, render the matching SQL, and list what is configured.

use serde_json::{Map, Value};
use std::fmt;

/// Kind of a field, with any nested structure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Number,
    Checkbox,
    Date,
    RichText,
    Select {
        options: Vec<SelectOption>,
        has_many: bool,
    },
    /// Nested object stored inline on the parent.
    Group(Vec<Field>),
    /// Repeated rows, stored in a child table.
    Array(Vec<Field>),
    Upload {
        relation_to: &'static str,
    },
    Relationship {
        relation_to: &'static str,
        has_many: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub default: Option<Value>,
    pub max_length: Option<usize>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
            default: None,
            max_length: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }
    pub fn textarea(name: &'static str) -> Self {
        Self::new(name, FieldKind::Textarea)
    }
    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }
    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }
    pub fn checkbox(name: &'static str) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }
    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }
    pub fn rich_text(name: &'static str) -> Self {
        Self::new(name, FieldKind::RichText)
    }
    pub fn select(name: &'static str, options: &[(&'static str, &'static str)]) -> Self {
        Self::new(
            name,
            FieldKind::Select {
                options: options
                    .iter()
                    .map(|&(label, value)| SelectOption { label, value })
                    .collect(),
                has_many: false,
            },
        )
    }
    pub fn group(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldKind::Group(fields))
    }
    pub fn array(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldKind::Array(fields))
    }
    pub fn upload(name: &'static str, relation_to: &'static str) -> Self {
        Self::new(name, FieldKind::Upload { relation_to })
    }
    pub fn relationship(name: &'static str, relation_to: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Relationship {
                relation_to,
                has_many: false,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
    pub fn has_many(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Select { has_many, .. } | FieldKind::Relationship { has_many, .. } => {
                *has_many = true;
            }
            _ => {}
        }
        self
    }
}

/// Who may read documents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadAccess {
    Public,
    /// Anonymous readers only see documents whose `field` equals `value`.
    AuthenticatedOrFieldEquals {
        field: &'static str,
        value: &'static str,
    },
}

impl fmt::Display for ReadAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadAccess::Public => f.write_str("public"),
            ReadAccess::AuthenticatedOrFieldEquals { field, value } => {
                write!(f, "{}={}", field, value)
            }
        }
    }
}

/// Access rules. Create, update, and delete always require a signed-in
/// user; only reads vary per collection.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    pub read: ReadAccess,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Versioning {
    pub drafts: bool,
    pub max_per_doc: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub slug: &'static str,
    pub title_field: &'static str,
    pub description: &'static str,
    pub fields: Vec<Field>,
    pub access: AccessPolicy,
    /// Change hooks fire for this collection.
    pub hooks_enabled: bool,
    pub versions: Option<Versioning>,
    /// Field a missing `slug` is derived from.
    pub slug_source: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSchema {
    pub slug: &'static str,
    pub fields: Vec<Field>,
    pub hooks_enabled: bool,
}

/// A validation failure at a dotted path (`location.zipCode`, `insurance.1.plan`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// URL-friendly form of a name: lowercase, runs of anything outside
/// `[a-z0-9]` collapsed to `-`, no leading or trailing `-`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

impl CollectionSchema {
    /// Fill declared defaults and derive `slug` when it is missing.
    pub fn apply_defaults(&self, doc: &mut Value) {
        if let Value::Object(map) = doc {
            apply_field_defaults(&self.fields, map);

            if let Some(source) = self.slug_source {
                let missing = match map.get("slug") {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.is_empty(),
                    _ => false,
                };
                if missing {
                    if let Some(Value::String(src)) = map.get(source) {
                        let slug = slugify(src);
                        map.insert("slug".to_string(), Value::String(slug));
                    }
                }
            }
        }
    }

    /// Check a document against the schema. An empty result means valid.
    pub fn validate(&self, doc: &Value) -> Vec<FieldError> {
        validate_document(&self.fields, doc)
    }
}

impl GlobalSchema {
    pub fn validate(&self, doc: &Value) -> Vec<FieldError> {
        validate_document(&self.fields, doc)
    }
}

fn validate_document(fields: &[Field], doc: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match doc {
        Value::Object(map) => validate_fields(fields, map, "", &mut errors),
        _ => push_error(&mut errors, "", "document must be a JSON object"),
    }
    errors
}

fn apply_field_defaults(fields: &[Field], map: &mut Map<String, Value>) {
    for field in fields {
        match &field.kind {
            FieldKind::Group(children) => {
                let entry = map
                    .entry(field.name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(inner) = entry {
                    apply_field_defaults(children, inner);
                }
            }
            FieldKind::Array(children) => {
                if let Some(Value::Array(rows)) = map.get_mut(field.name) {
                    for row in rows.iter_mut() {
                        if let Value::Object(inner) = row {
                            apply_field_defaults(children, inner);
                        }
                    }
                }
            }
            _ => {
                if let Some(default) = &field.default {
                    let absent = matches!(map.get(field.name), None | Some(Value::Null));
                    if absent {
                        map.insert(field.name.to_string(), default.clone());
                    }
                }
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_fields(
    fields: &[Field],
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<FieldError>,
) {
    for field in fields {
        let path = join_path(prefix, field.name);
        let value = map.get(field.name);

        if let FieldKind::Group(children) = &field.kind {
            match value {
                Some(Value::Object(inner)) => validate_fields(children, inner, &path, errors),
                None | Some(Value::Null) => {
                    validate_fields(children, &Map::new(), &path, errors)
                }
                Some(_) => errors.push(FieldError {
                    path,
                    message: "must be an object".to_string(),
                }),
            }
            continue;
        }

        if is_blank(value) {
            if field.required {
                errors.push(FieldError {
                    path,
                    message: "is required".to_string(),
                });
            }
            continue;
        }
        let Some(value) = value else { continue };

        validate_value(field, value, &path, errors);
    }
}

fn push_error(errors: &mut Vec<FieldError>, path: &str, message: impl Into<String>) {
    errors.push(FieldError {
        path: path.to_string(),
        message: message.into(),
    });
}

fn validate_value(field: &Field, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    match &field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Date => match value.as_str() {
            Some(s) => {
                if let Some(max) = field.max_length {
                    if s.chars().count() > max {
                        push_error(errors, path, format!("must be at most {} characters", max));
                    }
                }
            }
            None => push_error(errors, path, "must be a string"),
        },
        FieldKind::Email => match value.as_str() {
            Some(s) if looks_like_email(s) => {}
            _ => push_error(errors, path, "must be a valid email address"),
        },
        FieldKind::Number => {
            if !value.is_number() {
                push_error(errors, path, "must be a number");
            }
        }
        FieldKind::Checkbox => {
            if !value.is_boolean() {
                push_error(errors, path, "must be true or false");
            }
        }
        FieldKind::RichText => {
            if !value.is_object() {
                push_error(errors, path, "must be a rich text document");
            }
        }
        FieldKind::Select { options, has_many } => {
            let allowed = |v: &Value| {
                v.as_str()
                    .map(|s| options.iter().any(|o| o.value == s))
                    .unwrap_or(false)
            };
            let ok = if *has_many {
                value
                    .as_array()
                    .map(|items| items.iter().all(allowed))
                    .unwrap_or(false)
            } else {
                allowed(value)
            };
            if !ok {
                let values: Vec<&str> = options.iter().map(|o| o.value).collect();
                push_error(errors, path, format!("must be one of: {}", values.join(", ")));
            }
        }
        FieldKind::Array(children) => match value.as_array() {
            Some(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    let row_path = format!("{}.{}", path, i);
                    match row.as_object() {
                        Some(inner) => validate_fields(children, inner, &row_path, errors),
                        None => push_error(errors, &row_path, "must be an object"),
                    }
                }
            }
            None => push_error(errors, path, "must be a list"),
        },
        FieldKind::Upload { .. } | FieldKind::Relationship { .. } | FieldKind::Group(_) => {}
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_matches_cms_rule() {
        assert_eq!(slugify("Eric B. Chandler Health Center"), "eric-b-chandler-health-center");
        assert_eq!(slugify("  --Hope & Care!! "), "hope-care");
        assert_eq!(slugify("Planning Council 2025"), "planning-council-2025");
        assert_eq!(slugify("***"), "");
    }

    fn sample_schema() -> CollectionSchema {
        CollectionSchema {
            slug: "things",
            title_field: "name",
            description: "",
            fields: vec![
                Field::text("name").required(),
                Field::text("slug").required().unique(),
                Field::select("status", &[("Active", "active"), ("Inactive", "inactive")])
                    .required()
                    .default_value(json!("active")),
                Field::group(
                    "location",
                    vec![
                        Field::text("city").required(),
                        Field::text("state").default_value(json!("NJ")),
                    ],
                ),
                Field::array("tags", vec![Field::text("label").required()]),
                Field::textarea("excerpt").max_length(5),
            ],
            access: AccessPolicy {
                read: ReadAccess::Public,
            },
            hooks_enabled: false,
            versions: None,
            slug_source: Some("name"),
        }
    }

    #[test]
    fn defaults_and_slug_are_filled() {
        let schema = sample_schema();
        let mut doc = json!({ "name": "Hope House", "location": { "city": "Edison" } });
        schema.apply_defaults(&mut doc);

        assert_eq!(doc["slug"], "hope-house");
        assert_eq!(doc["status"], "active");
        assert_eq!(doc["location"]["state"], "NJ");
        assert!(schema.validate(&doc).is_empty());
    }

    #[test]
    fn explicit_slug_is_kept() {
        let schema = sample_schema();
        let mut doc = json!({ "name": "Hope House", "slug": "hope" });
        schema.apply_defaults(&mut doc);
        assert_eq!(doc["slug"], "hope");
    }

    #[test]
    fn validation_reports_nested_paths() {
        let schema = sample_schema();
        let doc = json!({
            "name": "X",
            "slug": "x",
            "status": "gone",
            "location": {},
            "tags": [{ "label": "ok" }, {}],
            "excerpt": "too long"
        });
        let paths: Vec<String> = schema.validate(&doc).into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec!["status", "location.city", "tags.1.label", "excerpt"]
        );
    }

    #[test]
    fn non_object_document_is_rejected() {
        let errors = sample_schema().validate(&json!([1, 2]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn read_access_renders_for_listing() {
        assert_eq!(ReadAccess::Public.to_string(), "public");
        let rule = ReadAccess::AuthenticatedOrFieldEquals {
            field: "status",
            value: "published",
        };
        assert_eq!(rule.to_string(), "status=published");
    }

    #[test]
    fn email_check() {
        assert!(looks_like_email("info@chandlerhealth.org"));
        assert!(!looks_like_email("info@localhost"));
        assert!(!looks_like_email("@example.org"));
    }
}
