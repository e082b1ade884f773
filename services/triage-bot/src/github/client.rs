//! GitHub REST client
//!
//! Thin wrapper over `reqwest` performing bearer-authenticated JSON calls.
//! Every failure is logged and returned as an [`ApiError`]; nothing retries.

use crate::error::ApiError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{error, info};

/// Public GitHub REST endpoint
pub const GITHUB_API: &str = "https://api.github.com";

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "okazaki-triage-bot";

/// Authenticated GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api_url: String,
    token: String,
    http: Client,
}

impl GitHubClient {
    /// Create a client for `api_url` bearing `token`
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let api_url = api_url.into();
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::request(&api_url, e))?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.send(Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.send(Method::PUT, path, body).await
    }

    pub async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.send(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        info!(method = %method, url = %url, "Performing GitHub API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .header(ACCEPT, ACCEPT_HEADER)
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!(method = %method, url = %url, error = %e, "GitHub API request failed");
            ApiError::request(&url, e)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::request(&url, e))?;

        if !status.is_success() {
            error!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                response = %text,
                "GitHub API returned an error"
            );
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        info!(method = %method, url = %url, "GitHub API request succeeded");
        to_value(&url, &text)
    }
}

/// Empty bodies (204 responses, DELETE) decode to `{}`
fn to_value(url: &str, text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text).map_err(|e| ApiError::decode(url, e))
}
