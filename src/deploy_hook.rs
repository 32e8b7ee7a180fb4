//! Cloudflare Pages deploy-hook housekeeping.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::config::{CloudflareConfig, Config};

pub fn deploy_hook_url(cf: &CloudflareConfig, hook_id: &str) -> String {
    format!(
        "{}/accounts/{}/pages/projects/{}/deploy_hooks/{}",
        cf.api_base.trim_end_matches('/'),
        cf.account_id,
        cf.project_name,
        hook_id
    )
}

/// Delete one deploy hook and return the API's JSON response.
pub async fn delete_deploy_hook(
    cf: &CloudflareConfig,
    api_token: &str,
    hook_id: &str,
    timeout_secs: u64,
) -> Result<Value> {
    if hook_id.trim().is_empty() {
        bail!("Hook ID is required");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let resp = client
        .delete(deploy_hook_url(cf, hook_id))
        .header("Authorization", format!("Bearer {}", api_token))
        .header("Content-Type", "application/json")
        .send()
        .await
        .context("Deploy hook request failed")?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let json: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));

    if !status.is_success() {
        let pretty = serde_json::to_string_pretty(&json).unwrap_or_default();
        bail!(
            "Failed to delete deploy hook (HTTP {}):\n{}",
            status.as_u16(),
            pretty
        );
    }
    Ok(json)
}

/// `hvc deploy-hook delete` entry point.
pub async fn run_delete(config: &Config, hook_id: &str) -> Result<()> {
    let cf = config
        .cloudflare
        .as_ref()
        .context("A [cloudflare] section with account_id and project_name is required")?;
    let token = std::env::var("CLOUDFLARE_API_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .context("CLOUDFLARE_API_TOKEN environment variable is required")?;

    println!("🗑️  Deleting deploy hook: {}\n", hook_id);
    let response = delete_deploy_hook(cf, &token, hook_id, config.cms.timeout_secs).await?;
    println!("✅ Deploy hook deleted successfully!\n");
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_layout() {
        let cf = CloudflareConfig {
            account_id: "acct".into(),
            project_name: "directory-frontend".into(),
            api_base: "https://api.cloudflare.com/client/v4/".into(),
        };
        assert_eq!(
            deploy_hook_url(&cf, "hook-1"),
            "https://api.cloudflare.com/client/v4/accounts/acct/pages/projects/directory-frontend/deploy_hooks/hook-1"
        );
    }
}
