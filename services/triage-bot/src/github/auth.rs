//! GitHub App Authentication
//!
//! Utilities for authenticating as a GitHub App using JWT and installation tokens.

use super::client::{GitHubClient, GITHUB_API};
use crate::error::ApiError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Default clock drift tolerated when checking token expiry
pub const DEFAULT_EXPIRY_DRIFT_MINUTES: i64 = 10;

/// Seconds an app JWT is backdated to absorb clock skew
const JWT_BACKDATE_SECS: i64 = 60;
/// GitHub caps app JWT lifetime at ten minutes
const JWT_LIFETIME_SECS: i64 = 600;

/// Claims GitHub expects in an app JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    /// The app ID
    pub iss: String,
}

impl AppClaims {
    fn issued_at(app_id: &str, now: DateTime<Utc>) -> Self {
        let now = now.timestamp();
        Self {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Whether a token expiring at `expires_at` (RFC 3339) should be refreshed,
/// treating it as expired `drift_minutes` early
pub fn is_token_expired(expires_at: &str, drift_minutes: i64) -> Result<bool, ApiError> {
    is_token_expired_at(expires_at, drift_minutes, Utc::now())
}

fn is_token_expired_at(
    expires_at: &str,
    drift_minutes: i64,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let expires_at = DateTime::parse_from_rfc3339(expires_at)
        .map_err(|e| ApiError::Auth(format!("Invalid token expiry '{}': {}", expires_at, e)))?
        .with_timezone(&Utc);

    Ok(now - Duration::minutes(drift_minutes) > expires_at)
}

/// Response from GitHub installation token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: String,
}

impl InstallationToken {
    pub fn is_expired(&self) -> Result<bool, ApiError> {
        is_token_expired(&self.expires_at, DEFAULT_EXPIRY_DRIFT_MINUTES)
    }
}

/// Credentials of one GitHub App installation
#[derive(Debug, Clone)]
pub struct GitHubApp {
    app_id: String,
    private_key_path: PathBuf,
    installation_id: u64,
    /// Requested token permissions, e.g. `issues: write`
    permissions: BTreeMap<String, String>,
    api_url: String,
}

impl GitHubApp {
    pub fn new(
        app_id: impl Into<String>,
        private_key_path: impl Into<PathBuf>,
        installation_id: u64,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            private_key_path: private_key_path.into(),
            installation_id,
            permissions: BTreeMap::new(),
            api_url: GITHUB_API.to_string(),
        }
    }

    /// Restrict the installation token to a permission
    pub fn permission(mut self, scope: impl Into<String>, access: impl Into<String>) -> Self {
        self.permissions.insert(scope.into(), access.into());
        self
    }

    /// Target a different API host (GitHub Enterprise, tests)
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// Sign an RS256 app JWT with the key at `private_key_path`
    fn jwt(&self, now: DateTime<Utc>) -> Result<String, ApiError> {
        let pem = std::fs::read(&self.private_key_path).map_err(|e| {
            ApiError::Auth(format!(
                "Failed to read private key {}: {}",
                self.private_key_path.display(),
                e
            ))
        })?;
        let key = EncodingKey::from_rsa_pem(&pem)
            .map_err(|e| ApiError::Auth(format!("Invalid private key: {}", e)))?;

        encode(
            &Header::new(Algorithm::RS256),
            &AppClaims::issued_at(&self.app_id, now),
            &key,
        )
        .map_err(|e| ApiError::Auth(format!("Failed to sign app JWT: {}", e)))
    }

    /// Exchange the app JWT for an installation access token
    pub async fn fetch_access_token(&self) -> Result<InstallationToken, ApiError> {
        info!(
            app_id = %self.app_id,
            installation_id = self.installation_id,
            "Fetching installation access token"
        );

        let client = GitHubClient::new(&self.api_url, self.jwt(Utc::now())?)?;
        let path = format!("/app/installations/{}/access_tokens", self.installation_id);

        let body = (!self.permissions.is_empty())
            .then(|| json!({ "permissions": self.permissions }));

        let response = client.post(&path, body.as_ref()).await?;

        serde_json::from_value(response).map_err(|e| ApiError::decode(&client.url(&path), e))
    }

    /// A client authenticated as the installation
    pub async fn installation_client(&self) -> Result<GitHubClient, ApiError> {
        let token = self.fetch_access_token().await?;
        GitHubClient::new(&self.api_url, token.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use std::io::Write;

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/test-app-key.pem");
    const PUBLIC_KEY: &[u8] = include_bytes!("../../tests/fixtures/test-app-key.pub.pem");

    fn key_file(pem: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem).unwrap();
        file
    }

    #[test]
    fn test_app_jwt_claims() {
        let key = key_file(PRIVATE_KEY);
        let now = Utc::now();
        let jwt = GitHubApp::new("12345", key.path(), 1).jwt(now).unwrap();

        let public = DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap();
        let decoded =
            decode::<AppClaims>(&jwt, &public, &Validation::new(Algorithm::RS256)).unwrap();

        assert_eq!(decoded.header.alg, Algorithm::RS256);
        assert_eq!(decoded.claims.iss, "12345");
        assert_eq!(decoded.claims.iat, now.timestamp() - 60);
        assert_eq!(decoded.claims.exp, now.timestamp() + 600);
    }

    #[test]
    fn test_app_jwt_rejects_bad_key() {
        let key = key_file(b"not a pem");
        let result = GitHubApp::new("12345", key.path(), 1).jwt(Utc::now());
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }

    #[test]
    fn test_token_expiry_with_drift() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert!(!is_token_expired_at("2024-05-01T12:30:00Z", 10, now).unwrap());
        // Drift moves "now" back, so a token expired 5 minutes ago still counts as live
        assert!(!is_token_expired_at("2024-05-01T11:55:00Z", 10, now).unwrap());
        assert!(is_token_expired_at("2024-05-01T11:45:00Z", 10, now).unwrap());
        assert!(is_token_expired_at("2024-05-01T11:59:00Z", 0, now).unwrap());
        assert!(is_token_expired_at("yesterday", 10, now).is_err());
    }

    #[tokio::test]
    async fn test_fetch_access_token() {
        let key = key_file(PRIVATE_KEY);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/app/installations/99/access_tokens")
            .match_header(
                "authorization",
                mockito::Matcher::Regex("^Bearer .+\\..+\\..+$".to_string()),
            )
            .match_body(mockito::Matcher::Json(
                json!({"permissions": {"issues": "write"}}),
            ))
            .with_status(201)
            .with_body(r#"{"token": "ghs_abc", "expires_at": "2030-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let app = GitHubApp::new("12345", key.path(), 99)
            .permission("issues", "write")
            .api_url(server.url());

        let token = app.fetch_access_token().await.unwrap();
        assert_eq!(token.token, "ghs_abc");
        assert!(!token.is_expired().unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_private_key() {
        let app = GitHubApp::new("12345", "/nonexistent/key.pem", 1);
        let err = app.fetch_access_token().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
