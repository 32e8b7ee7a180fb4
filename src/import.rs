//! Bulk provider import.
//!
//! Reads a JSON array of provider records, fills schema defaults (including
//! the slug), validates each record locally, and creates them one at a time
//! against a CMS target. Progress and the final summary go to stdout.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::client::{document_id, CmsClient, Credentials};
use crate::collections::{self, PROVIDERS};
use crate::config::{Config, TargetConfig};
use crate::models::Provider;
use crate::schema::FieldError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    /// Provider count reported by the CMS after the run, if it answered.
    pub verified_count: Option<u64>,
}

impl ImportSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.successful == self.total
    }
}

/// Read the provider file as raw records. Only the outer array is checked
/// here; each record is checked on its own by [`prepare`].
pub fn load_providers(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read provider file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse provider file: {}", path.display()))
}

/// Display name for progress lines.
fn record_name(record: &Value) -> &str {
    record
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("(unnamed)")
}

/// Turn a raw record into a request body, or the list of problems that
/// keep the CMS from accepting it.
pub fn prepare(record: &Value) -> std::result::Result<Value, Vec<FieldError>> {
    let schema = collections::providers();
    let as_record_error = |e: serde_json::Error| {
        vec![FieldError {
            path: "record".to_string(),
            message: e.to_string(),
        }]
    };
    let provider: Provider = serde_json::from_value(record.clone()).map_err(as_record_error)?;
    let mut doc = serde_json::to_value(&provider).map_err(as_record_error)?;
    schema.apply_defaults(&mut doc);
    let errors = schema.validate(&doc);
    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(errors)
    }
}

/// Print a warning and pause before writing to a guarded target.
pub async fn confirm_target(name: &str, target: &TargetConfig) {
    println!(
        "⚠️  WARNING: You are about to import to {}",
        name.to_uppercase()
    );
    println!("URL: {}", target.base_url());
    println!(
        "Press Ctrl+C to cancel, or wait {} seconds to continue...",
        target.confirm_delay_secs
    );
    tokio::time::sleep(Duration::from_secs(target.confirm_delay_secs)).await;
}

/// Create each record in order. A bad record is counted and skipped; the
/// run never stops early.
pub async fn import_providers(client: &CmsClient, records: &[Value]) -> ImportSummary {
    let total = records.len();
    let mut summary = ImportSummary {
        total,
        ..ImportSummary::default()
    };

    println!("📦 Importing providers...\n");

    for (i, record) in records.iter().enumerate() {
        println!("[{}/{}] {}", i + 1, total, record_name(record));

        match prepare(record) {
            Err(errors) => {
                let shown: Vec<String> = errors.iter().map(ToString::to_string).collect();
                println!("   ❌ Invalid: {}", shown.join("; "));
                summary.failed += 1;
            }
            Ok(doc) => match client.create(PROVIDERS, &doc).await {
                Ok(created) => {
                    let id = document_id(&created).unwrap_or_else(|| "?".to_string());
                    println!("   ✅ Created (ID: {})", id);
                    summary.successful += 1;
                }
                Err(e) => {
                    println!("   ❌ Failed: {:#}", e);
                    summary.failed += 1;
                }
            },
        }
        println!();
    }

    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("✨ Import complete!");
    println!("✅ Successful: {}", summary.successful);
    println!("❌ Failed: {}", summary.failed);
    println!("📊 Total: {}", summary.total);
    println!("{}", rule);

    println!("\n🔍 Verifying import...");
    match client.count(PROVIDERS).await {
        Ok(count) => {
            println!("✅ Database now contains {} providers", count);
            summary.verified_count = Some(count);
        }
        Err(e) => warn!(error = %format!("{:#}", e), "Could not verify provider count"),
    }

    summary
}

/// Log in to the target and import every provider in `file`.
pub async fn import_file(
    config: &Config,
    credentials: &Credentials,
    file: &Path,
    target: Option<&str>,
    skip_confirm: bool,
) -> Result<ImportSummary> {
    let providers = load_providers(file)?;
    let target_name = target.unwrap_or(&config.cms.default_target);
    let target_config = config.target(Some(target_name))?;

    if target_config.confirm && !skip_confirm {
        confirm_target(target_name, target_config).await;
    }

    println!("🚀 Starting authenticated bulk import...\n");
    println!("API URL: {}", target_config.base_url());
    println!("Providers to import: {}\n", providers.len());

    let mut client = CmsClient::new(target_config.base_url(), config.cms.timeout_secs)?;
    println!("🔐 Logging in as {} ...", credentials.email);
    client
        .login(credentials)
        .await
        .context("Cannot proceed without authentication")?;
    println!("✅ Login successful!\n");

    Ok(import_providers(&client, &providers).await)
}

/// `hvc import` entry point. Fails if any record was not created.
pub async fn run_import(
    config: &Config,
    file: &Path,
    target: Option<&str>,
    skip_confirm: bool,
) -> Result<()> {
    let credentials = Credentials::from_env(config)?;
    let summary = import_file(config, &credentials, file, target, skip_confirm).await?;

    if summary.all_succeeded() {
        println!("\n🎉 All providers imported successfully!");
        Ok(())
    } else {
        println!("\n⚠️  Some providers failed to import. Check errors above.");
        bail!(
            "{} of {} providers failed to import",
            summary.failed,
            summary.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepare_fills_slug_and_status() {
        let p = json!({
            "name": "Robert Wood Johnson AIDS Program",
            "description": "Primary HIV care",
            "location": { "address": "1 RWJ Pl", "city": "New Brunswick", "zipCode": "08901", "county": "middlesex" },
            "contact": { "phone": "(732) 235-7733" },
            "coordinates": { "lat": 40.49, "lng": -74.45 }
        });
        let doc = prepare(&p).unwrap();
        assert_eq!(doc["slug"], "robert-wood-johnson-aids-program");
        assert_eq!(doc["status"], "active");
        assert_eq!(doc["location"]["state"], "NJ");
    }

    #[test]
    fn prepare_reports_missing_fields() {
        let p = json!({ "name": "Incomplete Clinic" });
        let errors = prepare(&p).unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"description"));
        assert!(paths.contains(&"location.county"));
        assert!(paths.contains(&"coordinates.lat"));
    }

    #[test]
    fn load_providers_reads_array() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(&path, r#"[{ "name": "A" }, { "name": "B" }]"#).unwrap();
        let providers = load_providers(&path).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(record_name(&providers[1]), "B");
    }

    #[test]
    fn malformed_records_are_rejected_one_by_one() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(
            &path,
            r#"[{ "name": "Good Clinic" }, { "description": "no name" },
                { "name": "Half Coords", "coordinates": { "lat": 40.1 } }]"#,
        )
        .unwrap();
        let records = load_providers(&path).unwrap();
        assert_eq!(records.len(), 3);

        let missing_name = prepare(&records[1]).unwrap_err();
        assert_eq!(missing_name[0].path, "record");
        assert!(missing_name[0].message.contains("name"));
        assert_eq!(record_name(&records[1]), "(unnamed)");

        let half_coords = prepare(&records[2]).unwrap_err();
        assert_eq!(half_coords[0].path, "record");
        assert!(half_coords[0].message.contains("lng"));
    }

    #[test]
    fn non_array_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(&path, r#"{ "name": "A" }"#).unwrap();
        let err = load_providers(&path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse provider file"));
    }

    #[test]
    fn summary_success_requires_every_record() {
        let summary = ImportSummary {
            successful: 2,
            failed: 1,
            total: 3,
            verified_count: None,
        };
        assert!(!summary.all_succeeded());
        assert!(ImportSummary::default().all_succeeded());
    }
}
