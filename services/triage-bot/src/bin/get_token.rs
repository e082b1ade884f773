//! GitHub App Installation Token Generator
//!
//! Generates a short-lived installation access token from GitHub App credentials.
//! Uses RS256 JWT signing to authenticate as the GitHub App, then exchanges
//! the JWT for an installation token.
//!
//! ## Usage
//! ```bash
//! # With command line arguments
//! get-token \
//!   --app-id 123456 \
//!   --private-key-path ./key.pem \
//!   --installation-id 78901234
//!
//! # With environment variables
//! GITHUB_APP_ID=123456 \
//! GITHUB_PRIVATE_KEY_PATH=./key.pem \
//! GITHUB_INSTALLATION_ID=78901234 \
//! get-token --format json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use tracing::info;
use triage_bot::github::{GitHubApp, GITHUB_API};
use triage_bot::logging::{self, LogFormat};

/// GitHub App Installation Token Generator
#[derive(Parser, Debug)]
#[command(name = "get-token")]
#[command(about = "Generate GitHub App installation access tokens")]
#[command(version)]
struct Args {
    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    app_id: String,

    /// Path to the private key PEM file
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    private_key_path: String,

    /// GitHub App Installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    installation_id: u64,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API)]
    api_url: String,

    /// Output file path (optional, prints to stdout if not specified)
    #[arg(long, short)]
    output: Option<String>,

    /// Output format: token (default), json
    #[arg(long, default_value = "token")]
    format: String,
}

#[derive(Serialize)]
struct TokenOutput {
    token: String,
    installation_id: u64,
    expires_at: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(LogFormat::Text);

    let app = GitHubApp::new(&args.app_id, &args.private_key_path, args.installation_id)
        .api_url(args.api_url.as_str());
    let token = app
        .fetch_access_token()
        .await
        .context("Failed to fetch installation token")?;

    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&TokenOutput {
            token: token.token.clone(),
            installation_id: args.installation_id,
            expires_at: token.expires_at.clone(),
        })?,
        _ => token.token.clone(),
    };

    if let Some(output_path) = args.output {
        fs::write(&output_path, &output)
            .with_context(|| format!("Failed to write token to {}", output_path))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&output_path, fs::Permissions::from_mode(0o600))?;
        }
        info!(path = %output_path, "Token saved");
    } else {
        println!("{}", output);
        info!(expires_at = %token.expires_at, "Token generated successfully");
    }

    Ok(())
}
