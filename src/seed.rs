//! Content seeding: FAQ entries and the Site Settings navigation menu.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use crate::client::{document_id, CmsClient, Credentials};
use crate::collections::{self, FAQS, SITE_SETTINGS};
use crate::config::Config;
use crate::models::{Faq, NavigationItem};

pub const DEFAULT_HOTLINE: &str = "1-800-HIV-INFO";
pub const DEFAULT_CONTACT_EMAIL: &str = "info@hivconnectcnj.org";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

fn faq(question: &str, answer: &str, category: &str, order: u32) -> Faq {
    Faq {
        question: question.to_string(),
        answer: Some(answer.to_string()),
        category: category.to_string(),
        order,
        language: "english".to_string(),
        status: "published".to_string(),
    }
}

/// Built-in FAQ set.
pub fn default_faqs() -> Vec<Faq> {
    vec![
        faq(
            "What is HIV Connect Central NJ?",
            "HIV Connect Central NJ is the Middlesex-Somerset-Hunterdon HIV Health Services Planning Council's resource directory and information hub. We connect people living with HIV/AIDS to medical care, support services, and community resources across central New Jersey.",
            "general",
            1,
        ),
        faq(
            "Who is eligible for services?",
            "Services are available to anyone living with HIV/AIDS in Middlesex, Somerset, or Hunterdon counties. Many services are also available to those affected by HIV, including family members and caregivers. Some programs have specific eligibility requirements based on income, insurance status, or other factors. Contact individual providers to learn about their specific eligibility criteria.",
            "general",
            2,
        ),
        faq(
            "How do I access services?",
            "You can access services by contacting providers directly through our directory. Many providers offer walk-in services, while others require appointments. If you're unsure where to start, call our hotline at (732) 937-5288 for guidance.",
            "general",
            3,
        ),
        faq(
            "Where can I get tested for HIV?",
            "HIV testing is available at multiple locations throughout our service area, including health departments, community health centers, and medical clinics. Many sites offer free, confidential testing with no appointment necessary. Visit our Find Services page to locate testing sites near you.",
            "testing",
            1,
        ),
        faq(
            "Is HIV testing confidential?",
            "Yes, HIV testing is confidential. Testing sites follow strict privacy protocols to protect your information. You can choose between confidential testing (results linked to your name but kept private) or anonymous testing (no name attached to test). All testing sites in New Jersey are required to maintain confidentiality.",
            "testing",
            2,
        ),
        faq(
            "How much does HIV testing cost?",
            "Many testing sites offer free HIV testing. Sites that charge typically accept insurance, and financial assistance may be available for those without insurance. No one should be denied HIV testing due to inability to pay.",
            "testing",
            3,
        ),
        faq(
            "What is antiretroviral therapy (ART)?",
            "Antiretroviral therapy (ART) is a combination of HIV medicines taken daily to treat HIV infection. ART helps people with HIV live longer, healthier lives and reduces the risk of HIV transmission. When taken as prescribed, ART can reduce the amount of HIV in the blood (viral load) to undetectable levels.",
            "treatment",
            1,
        ),
        faq(
            "Can I afford HIV treatment?",
            "Yes. Several programs can help you afford HIV treatment, including the Ryan White HIV/AIDS Program, AIDS Drug Assistance Program (ADAP), Medicaid, and Medicare. Many providers offer sliding fee scales based on income. Our case managers can help you access these programs and navigate insurance options.",
            "treatment",
            2,
        ),
        faq(
            "What services are available to people living with HIV?",
            "Services include medical care, case management, mental health counseling, substance abuse treatment, nutrition services, transportation assistance, housing support, legal services, and emergency financial assistance. The range of services varies by provider. Visit our Find Services page to explore all available services.",
            "services",
            1,
        ),
        faq(
            "Do I need insurance to receive services?",
            "No. Many services are available regardless of insurance status. The Ryan White HIV/AIDS Program provides services to eligible individuals who are uninsured or underinsured. Our case managers can help you apply for insurance programs like Medicaid or access services through the Ryan White Program.",
            "services",
            2,
        ),
        faq(
            "What is the HIV Health Services Planning Council?",
            "The HIV Health Services Planning Council is a federally-mandated body that plans, prioritizes, and allocates Ryan White Program funds for HIV services in Middlesex, Somerset, and Hunterdon counties. The Council includes people living with HIV, healthcare providers, community representatives, and local officials who work together to ensure effective HIV care and services.",
            "planning-council",
            1,
        ),
        faq(
            "How can I join the Planning Council?",
            "The Planning Council welcomes new members, especially people living with HIV/AIDS. Membership applications are reviewed periodically, and members serve two-year terms. Visit our Planning Council page to learn about membership requirements and download an application, or call (732) 937-5288 for more information.",
            "planning-council",
            2,
        ),
    ]
}

pub fn load_faqs(path: &Path) -> Result<Vec<Faq>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read FAQ file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse FAQ file: {}", path.display()))
}

/// Create each FAQ, pausing `delay` between successful requests.
pub async fn seed_faqs(client: &CmsClient, faqs: &[Faq], delay: Duration) -> SeedSummary {
    let mut summary = SeedSummary::default();

    for faq in faqs {
        let Some(doc) = faq.to_document() else {
            println!("⚠️  No answer found for: \"{}\" - skipping", faq.question);
            summary.skipped += 1;
            continue;
        };

        println!("📝 Creating FAQ: \"{}\"", faq.question);
        match client.create(FAQS, &doc).await {
            Ok(created) => {
                let id = document_id(&created).unwrap_or_else(|| "?".to_string());
                println!("✅ Created FAQ with ID: {}", id);
                summary.created += 1;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                println!("❌ Error creating FAQ \"{}\": {:#}", faq.question, e);
                summary.failed += 1;
            }
        }
    }

    println!("\n📊 Summary:");
    println!("✅ Successfully created: {} FAQs", summary.created);
    if summary.failed > 0 {
        println!("❌ Failed: {} FAQs", summary.failed);
    }
    summary
}

/// `hvc seed faqs` entry point.
pub async fn run_seed_faqs(
    config: &Config,
    target: Option<&str>,
    file: Option<&Path>,
) -> Result<SeedSummary> {
    let credentials = Credentials::from_env(config)?;
    let faqs = match file {
        Some(path) => load_faqs(path)?,
        None => default_faqs(),
    };
    let mut client = CmsClient::for_target(config, target)?;

    println!("🚀 Starting FAQ seeding...\n");
    println!("API URL: {}", client.base_url());
    println!("Total FAQs to create: {}\n", faqs.len());

    println!("🔐 Logging in...");
    client.login(&credentials).await?;
    println!("✅ Login successful\n");

    let delay = Duration::from_millis(config.cms.request_delay_ms);
    let summary = seed_faqs(&client, &faqs, delay).await;
    println!("\n🎉 FAQ seeding complete!");
    Ok(summary)
}

/// The four-section main menu.
pub fn default_navigation() -> Vec<NavigationItem> {
    vec![
        NavigationItem::section(
            "Services",
            "#",
            0,
            vec![
                NavigationItem::link("Get Tested", "/get-tested", 0),
                NavigationItem::link("Treatment & Care", "/treatment-care", 1),
                NavigationItem::link("Support Resources", "/support-resources", 2),
                NavigationItem::link("Find Services", "/find-services", 3),
            ],
        ),
        NavigationItem::section(
            "About",
            "#",
            1,
            vec![
                NavigationItem::link("About Us", "/about", 0),
                NavigationItem::link("Planning Council", "/planning-council-application", 1),
                NavigationItem::link("FAQ", "/faq", 2),
            ],
        ),
        NavigationItem::section(
            "Resources",
            "#",
            2,
            vec![
                NavigationItem::link("Resource Library", "/resources", 0),
                NavigationItem::link("Bylaws", "/bylaws", 1),
                NavigationItem::link("Service Standards", "/service-standards", 2),
                NavigationItem::link("Events", "/events", 3),
            ],
        ),
        NavigationItem::section("Contact", "/contact", 3, Vec::new()),
    ]
}

fn is_empty_setting(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Merge the menu into the current settings. Every other field is kept;
/// site name, hotline, and contact email are filled only when empty.
pub fn merge_navigation(current: Value, navigation: &[NavigationItem]) -> Result<Value> {
    let mut settings = match current {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if is_empty_setting(settings.get("siteName")) {
        settings.insert("siteName".into(), Value::from(collections::DEFAULT_SITE_NAME));
    }
    if is_empty_setting(settings.get("hotlineNumber")) {
        settings.insert("hotlineNumber".into(), Value::from(DEFAULT_HOTLINE));
    }
    if is_empty_setting(settings.get("contactEmail")) {
        settings.insert("contactEmail".into(), Value::from(DEFAULT_CONTACT_EMAIL));
    }
    settings.insert(
        "navigation".into(),
        serde_json::to_value(navigation).context("Failed to serialize navigation")?,
    );
    Ok(Value::Object(settings))
}

/// Fetch, merge, and store the Site Settings navigation. Returns the
/// settings as the CMS stored them.
pub async fn populate_navigation(client: &CmsClient) -> Result<Value> {
    let current = client
        .get_global(SITE_SETTINGS)
        .await
        .context("Failed to fetch current settings")?;
    if let Some(map) = current.as_object() {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        println!("Current settings: {}", keys.join(", "));
    }

    let updated = merge_navigation(current, &default_navigation())?;
    let errors = collections::site_settings().validate(&updated);
    if !errors.is_empty() {
        let shown: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Merged settings are invalid: {}", shown.join("; "));
    }
    client.update_global(SITE_SETTINGS, &updated).await
}

/// `hvc seed navigation` entry point.
pub async fn run_seed_navigation(config: &Config, target: Option<&str>) -> Result<()> {
    let credentials = Credentials::from_env(config)?;
    let mut client = CmsClient::for_target(config, target)?;

    println!("🔐 Logging in...");
    client.login(&credentials).await?;
    println!("✅ Login successful");

    println!("📝 Updating SiteSettings navigation...");
    let stored = populate_navigation(&client).await?;
    println!("✅ Navigation updated successfully!");

    let items = stored
        .get("navigation")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    println!("📊 Navigation items: {}", items.len());
    for item in &items {
        let label = item.get("label").and_then(Value::as_str).unwrap_or("?");
        let children = item
            .get("children")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        println!("  - {} ({} children)", label, children);
    }
    Ok(())
}
