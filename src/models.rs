//! Typed records exchanged with the CMS by the scripts.
//!
//! Field names follow the CMS's camelCase JSON. Optional values are skipped
//! when serializing so server-side defaults still apply.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub hours: Hours,
    #[serde(default)]
    pub services: Services,
    #[serde(default)]
    pub eligibility: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ryan_white: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ryan_white_parts: Vec<String>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub accessibility: Vec<Feature>,
    #[serde(default)]
    pub insurance: Vec<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub county: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone24hr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Free-form opening hours per weekday (`"09:00 - 17:00"`, `"Closed"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Hours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Services {
    #[serde(default)]
    pub medical: Vec<Service>,
    #[serde(default)]
    pub support: Vec<Service>,
    #[serde(default)]
    pub prevention: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub requirement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Language {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    pub feature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub plan: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// FAQ entry before its answer is wrapped as rich text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faq {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    pub category: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_faq_language")]
    pub language: String,
    #[serde(default = "default_faq_status")]
    pub status: String,
}

fn default_faq_language() -> String {
    "english".to_string()
}
fn default_faq_status() -> String {
    "published".to_string()
}

impl Faq {
    /// Request body for the `faqs` collection, or `None` when there is no
    /// answer to publish.
    pub fn to_document(&self) -> Option<Value> {
        let answer = self.answer.as_deref().filter(|a| !a.trim().is_empty())?;
        Some(json!({
            "question": self.question,
            "answer": rich_text(answer),
            "category": self.category,
            "order": self.order,
            "language": self.language,
            "status": self.status,
        }))
    }
}

/// Wrap plain text as a single-paragraph Lexical editor document.
pub fn rich_text(text: &str) -> Value {
    json!({
        "root": {
            "type": "root",
            "children": [{
                "type": "paragraph",
                "version": 1,
                "children": [{
                    "type": "text",
                    "version": 1,
                    "text": text,
                    "format": 0,
                    "style": "",
                    "mode": "normal",
                    "detail": 0
                }],
                "direction": "ltr",
                "format": "",
                "indent": 0
            }],
            "direction": "ltr",
            "format": "",
            "indent": 0,
            "version": 1
        }
    })
}

/// Site navigation entry. Top-level items may carry one level of children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub label: String,
    pub url: String,
    pub order: u32,
    #[serde(default)]
    pub open_in_new_tab: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavigationItem>>,
}

impl NavigationItem {
    pub fn link(label: &str, url: &str, order: u32) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
            order,
            open_in_new_tab: false,
            children: None,
        }
    }

    pub fn section(label: &str, url: &str, order: u32, children: Vec<NavigationItem>) -> Self {
        Self {
            children: Some(children),
            ..Self::link(label, url, order)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_reads_camel_case() {
        let raw = json!({
            "name": "Hyacinth AIDS Foundation",
            "description": "Support services",
            "type": "Community",
            "location": { "address": "317 George St", "city": "New Brunswick", "zipCode": "08901", "county": "middlesex" },
            "contact": { "phone": "(732) 246-0204", "phone24hr": "(800) 433-0254" },
            "ryanWhite": true,
            "ryanWhiteParts": ["A"],
            "languages": [{ "language": "English" }, { "language": "Spanish" }],
            "coordinates": { "lat": 40.49, "lng": -74.44 }
        });
        let provider: Provider = serde_json::from_value(raw).unwrap();
        assert_eq!(provider.provider_type.as_deref(), Some("Community"));
        assert_eq!(provider.location.zip_code, "08901");
        assert_eq!(provider.contact.phone24hr.as_deref(), Some("(800) 433-0254"));
        assert_eq!(provider.ryan_white, Some(true));
        assert_eq!(provider.languages.len(), 2);

        let back = serde_json::to_value(&provider).unwrap();
        assert_eq!(back["location"]["zipCode"], "08901");
        assert_eq!(back["ryanWhiteParts"], json!(["A"]));
        assert!(back.get("slug").is_none());
        assert!(back.get("status").is_none());
    }

    #[test]
    fn faq_without_answer_has_no_document() {
        let faq = Faq {
            question: "Is HIV testing confidential?".into(),
            answer: Some("   ".into()),
            category: "testing".into(),
            order: 2,
            language: "english".into(),
            status: "published".into(),
        };
        assert!(faq.to_document().is_none());
    }

    #[test]
    fn faq_answer_is_lexical() {
        let faq: Faq = serde_json::from_value(json!({
            "question": "Q?",
            "answer": "A.",
            "category": "general"
        }))
        .unwrap();
        let doc = faq.to_document().unwrap();
        assert_eq!(doc["status"], "published");
        assert_eq!(doc["answer"]["root"]["children"][0]["children"][0]["text"], "A.");
        assert_eq!(doc["answer"]["root"]["direction"], "ltr");
    }

    #[test]
    fn navigation_serializes_camel_case() {
        let item = NavigationItem::section(
            "About",
            "#",
            1,
            vec![NavigationItem::link("FAQ", "/faq", 2)],
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["openInNewTab"], false);
        assert_eq!(value["children"][0]["url"], "/faq");
        assert!(value["children"][0].get("children").is_none());
    }
}
