//! REST client for the hosted CMS.
//!
//! Wraps the CMS's collection and global endpoints under `/api`. A client
//! starts anonymous; [`CmsClient::login`] attaches a session that later
//! requests authenticate with. Non-success responses become errors of the
//! form `"<METHOD> <path> failed (<status>): <body>"`, with the body cut to
//! 200 characters.

use anyhow::{bail, Context, Result};
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

const ERROR_BODY_LIMIT: usize = 200;

/// Admin credentials for scripted access.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// `ADMIN_PASSWORD` is required. The email comes from `ADMIN_EMAIL`,
    /// falling back to `cms.admin_email`.
    pub fn from_env(config: &Config) -> Result<Self> {
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty())
            .context("ADMIN_PASSWORD environment variable is required")?;
        let email = std::env::var("ADMIN_EMAIL")
            .ok()
            .filter(|e| !e.is_empty())
            .or_else(|| config.cms.admin_email.clone())
            .context("Set ADMIN_EMAIL or cms.admin_email in the config file")?;
        Ok(Self { email, password })
    }
}

/// Authentication material returned by a successful login.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub cookie: Option<String>,
}

impl Session {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(cookie) = &self.cookie {
            request.header(COOKIE, cookie)
        } else if let Some(token) = &self.token {
            request.header(AUTHORIZATION, format!("JWT {}", token))
        } else {
            request
        }
    }
}

/// Render a document's `id` for use in a URL path.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep only `name=value` from each `Set-Cookie` header.
fn cookie_header(response: &Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// REST client for one CMS deployment.
///
/// Requests are sent anonymously until [`CmsClient::login`] stores a
/// [`Session`]; after that every request carries it. All calls are
/// sequential from the caller's point of view and share one timeout.
pub struct CmsClient {
    /// Shared connection pool with the per-request timeout applied.
    http: reqwest::Client,
    /// Deployment root without a trailing `/`, e.g. `https://cms.example.org`.
    base_url: String,
    /// Set by a successful login.
    session: Option<Session>,
}

impl CmsClient {
    /// Create an anonymous client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Deployment root; a trailing `/` is dropped.
    /// * `timeout_secs` - Per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Client for a named target, or the configured default target.
    pub fn for_target(config: &Config, target: Option<&str>) -> Result<Self> {
        let target = config.target(target)?;
        Self::new(target.base_url(), config.cms.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.session {
            Some(session) => session.apply(request),
            None => request,
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        debug!(%method, path, "CMS request");
        let mut request = self.request(method.clone(), path);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, path))
    }

    async fn expect_success(method: &Method, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        bail!(
            "{} {} failed ({}): {}",
            method,
            path,
            status.as_u16(),
            body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
        );
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let response = self.send(method.clone(), path, body).await?;
        let response = Self::expect_success(&method, path, response).await?;
        response
            .json()
            .await
            .with_context(|| format!("{} {} returned invalid JSON", method, path))
    }

    /// Log in and keep the returned token and session cookie.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&Session> {
        let path = "/api/users/login";
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let response = self.send(Method::POST, path, Some(&body)).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "Login failed ({}): {}",
                status.as_u16(),
                text.chars().take(ERROR_BODY_LIMIT).collect::<String>()
            );
        }

        let cookie = cookie_header(&response);
        let payload: Value = response
            .json()
            .await
            .context("Login response was not JSON")?;
        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string);

        if token.is_none() && cookie.is_none() {
            bail!("Login response carried neither a token nor a session cookie");
        }

        Ok(&*self.session.insert(Session { token, cookie }))
    }

    /// Create a document and return it as stored.
    pub async fn create(&self, collection: &str, doc: &Value) -> Result<Value> {
        let path = format!("/api/{}", collection);
        let body = self.call(Method::POST, &path, Some(doc)).await?;
        body.get("doc")
            .cloned()
            .with_context(|| format!("POST {} response has no doc", path))
    }

    pub async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let path = format!("/api/{}/{}", collection, id);
        let response = self.send(Method::GET, &path, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(&Method::GET, &path, response).await?;
        let doc = response
            .json()
            .await
            .with_context(|| format!("GET {} returned invalid JSON", path))?;
        Ok(Some(doc))
    }

    /// Apply a partial update and return the updated document.
    pub async fn update(&self, collection: &str, id: &str, patch: &Value) -> Result<Value> {
        let path = format!("/api/{}/{}", collection, id);
        let body = self.call(Method::PATCH, &path, Some(patch)).await?;
        body.get("doc")
            .cloned()
            .with_context(|| format!("PATCH {} response has no doc", path))
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = format!("/api/{}/{}", collection, id);
        let response = self.send(Method::DELETE, &path, None).await?;
        Self::expect_success(&Method::DELETE, &path, response).await?;
        Ok(())
    }

    /// Total number of documents in a collection.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        let path = format!("/api/{}?limit=0", collection);
        let body = self.call(Method::GET, &path, None).await?;
        body.get("totalDocs")
            .and_then(Value::as_u64)
            .with_context(|| format!("GET {} response has no totalDocs", path))
    }

    pub async fn get_global(&self, slug: &str) -> Result<Value> {
        let path = format!("/api/globals/{}", slug);
        self.call(Method::GET, &path, None).await
    }

    /// Replace a global and return it as stored.
    pub async fn update_global(&self, slug: &str, doc: &Value) -> Result<Value> {
        let path = format!("/api/globals/{}", slug);
        let body = self.call(Method::POST, &path, Some(doc)).await?;
        Ok(match body.get("result") {
            Some(result) => result.clone(),
            None => body,
        })
    }
}
