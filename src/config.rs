//! TOML configuration parsing.
//!
//! A single file (default `./config/hvc.toml`) describes which CMS
//! deployments the scripts talk to, how the change logger de-duplicates,
//! where the hook receiver binds, and the Cloudflare project used for
//! deploy-hook housekeeping.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
    #[serde(default)]
    pub change_log: ChangeLogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cloudflare: Option<CloudflareConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CmsConfig {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_target_name")]
    pub default_target: String,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            default_target: default_target_name(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_target_name() -> String {
    "staging".to_string()
}

/// A named CMS deployment (e.g. `staging`, `production`).
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub url: String,
    /// Require a visible countdown before bulk writes.
    #[serde(default)]
    pub confirm: bool,
    #[serde(default = "default_confirm_delay_secs")]
    pub confirm_delay_secs: u64,
}

fn default_confirm_delay_secs() -> u64 {
    3
}

impl TargetConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChangeLogConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            capacity: default_capacity(),
        }
    }
}

fn default_cooldown_ms() -> u64 {
    5000
}
fn default_capacity() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4010".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub project_name: String,
    #[serde(default = "default_cloudflare_api_base")]
    pub api_base: String,
}

fn default_cloudflare_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

impl Config {
    /// Resolve a target by name, falling back to `cms.default_target`.
    pub fn target(&self, name: Option<&str>) -> Result<&TargetConfig> {
        let name = name.unwrap_or(&self.cms.default_target);
        self.targets.get(name).with_context(|| {
            let known: Vec<&str> = self.targets.keys().map(String::as_str).collect();
            format!(
                "Unknown target: '{}'. Configured targets: {}",
                name,
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }

    /// Checks that hold for every command. Whether a target exists is
    /// checked by [`Config::target`], since the hook receiver needs none.
    fn validate(&self) -> Result<()> {
        for (name, target) in &self.targets {
            if !(target.url.starts_with("http://") || target.url.starts_with("https://")) {
                bail!("targets.{}.url must start with http:// or https://", name);
            }
        }

        if self.change_log.cooldown_ms == 0 {
            bail!("change_log.cooldown_ms must be > 0");
        }
        if self.change_log.capacity == 0 {
            bail!("change_log.capacity must be >= 1");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
[cms]
admin_email = "admin@example.org"

[targets.staging]
url = "https://cms-staging.example.org/"

[targets.production]
url = "https://cms.example.org"
confirm = true
"#;

    #[test]
    fn parses_targets_and_defaults() {
        let cfg = parse_config(BASIC).unwrap();
        assert_eq!(cfg.cms.default_target, "staging");
        assert_eq!(cfg.cms.request_delay_ms, 100);
        assert_eq!(cfg.change_log.cooldown_ms, 5000);
        assert_eq!(cfg.change_log.capacity, 10_000);
        assert_eq!(cfg.server.bind, "127.0.0.1:4010");

        let staging = cfg.target(None).unwrap();
        assert_eq!(staging.base_url(), "https://cms-staging.example.org");
        assert!(!staging.confirm);

        let prod = cfg.target(Some("production")).unwrap();
        assert!(prod.confirm);
        assert_eq!(prod.confirm_delay_secs, 3);
    }

    #[test]
    fn unknown_target_lists_known_ones() {
        let cfg = parse_config(BASIC).unwrap();
        let err = cfg.target(Some("qa")).unwrap_err().to_string();
        assert!(err.contains("qa"));
        assert!(err.contains("production, staging"));
    }

    #[test]
    fn receiver_only_config_needs_no_targets() {
        let cfg = parse_config("[server]\nbind = \"0.0.0.0:4010\"\n").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:4010");

        let err = cfg.target(None).unwrap_err().to_string();
        assert!(err.contains("Unknown target: 'staging'"));
        assert!(err.contains("(none)"));
    }

    #[test]
    fn dangling_default_target_fails_on_lookup() {
        let content = r#"
[cms]
default_target = "prod"

[targets.staging]
url = "https://cms-staging.example.org"
"#;
        let cfg = parse_config(content).unwrap();
        let err = cfg.target(None).unwrap_err().to_string();
        assert!(err.contains("Unknown target: 'prod'"));
        assert!(cfg.target(Some("staging")).is_ok());
    }

    #[test]
    fn rejects_non_http_url() {
        let content = r#"
[targets.staging]
url = "cms-staging.example.org"
"#;
        assert!(parse_config(content).is_err());
    }

    #[test]
    fn rejects_zero_cooldown() {
        let content = r#"
[targets.staging]
url = "https://cms-staging.example.org"

[change_log]
cooldown_ms = 0
"#;
        let err = parse_config(content).unwrap_err().to_string();
        assert!(err.contains("cooldown_ms"));
    }
}
