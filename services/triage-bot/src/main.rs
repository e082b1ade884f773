//! Okazaki Triage Bot
//!
//! Processes the rule file, syncs the configured labels and runs the auto
//! triage plugin against one repository as a GitHub App installation.
//!
//! ## Usage
//! ```bash
//! # Inspect the resolved configuration only
//! triage-bot --config okazaki.yml --print-config
//!
//! # Full run
//! GITHUB_APP_ID=123456 \
//! GITHUB_PRIVATE_KEY_PATH=./key.pem \
//! GITHUB_INSTALLATION_ID=78901234 \
//! GITHUB_REPOSITORY=clivern/okazaki \
//! triage-bot --config okazaki.yml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use triage_bot::config::{Parser as ConfigParser, DEFAULT_DATA_KEY};
use triage_bot::github::{GitHubApp, GITHUB_API};
use triage_bot::logging::{self, LogFormat};
use triage_bot::plugins::{AutoTriageV1Plugin, Plugin};

/// GitHub triage bot
#[derive(Parser, Debug)]
#[command(name = "triage-bot")]
#[command(about = "Label issues and pull requests from a YAML rule file")]
#[command(version)]
struct Args {
    /// Path to the rule file
    #[arg(long, env = "TRIAGE_CONFIG", default_value = "okazaki.yml")]
    config: PathBuf,

    /// Top-level key holding substitution values
    #[arg(long, default_value = DEFAULT_DATA_KEY)]
    data_key: String,

    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    app_id: Option<String>,

    /// Path to the private key PEM file
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    private_key_path: Option<PathBuf>,

    /// GitHub App Installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    installation_id: Option<u64>,

    /// Repository in format owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API)]
    api_url: String,

    /// Print the resolved configuration as YAML
    #[arg(long)]
    print_config: bool,

    /// Log matches without changing anything on GitHub
    #[arg(long)]
    dry_run: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn validate_repo(repo: &str) -> Result<()> {
    let parts: Vec<&str> = repo.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
        anyhow::bail!("Invalid repository format: {}. Expected: owner/repo", repo);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_format);

    let mut parser = ConfigParser::new(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?
        .data_key(args.data_key.as_str());
    parser.process().context("Failed to process config")?;

    if args.print_config {
        println!("{}", parser.dump()?);
    }

    let (Some(app_id), Some(key_path), Some(installation_id), Some(repo)) = (
        args.app_id.as_deref(),
        args.private_key_path.as_ref(),
        args.installation_id,
        args.repo.as_deref(),
    ) else {
        if !args.print_config {
            warn!("GitHub App credentials or repository missing; nothing to run.");
        }
        return Ok(());
    };
    validate_repo(repo)?;

    let app = GitHubApp::new(app_id, key_path, installation_id)
        .permission("issues", "write")
        .permission("pull_requests", "write")
        .api_url(args.api_url.as_str());
    let client = app
        .installation_client()
        .await
        .context("Failed to authenticate as installation")?;

    if args.dry_run {
        info!(rules = parser.label_rules().len(), "Dry run: skipping label sync");
    } else {
        for rule in parser.label_rules() {
            if let Err(e) = client.sync_label_rule(repo, rule).await {
                error!(rule = %rule.name, error = %e, "Failed to sync label rule");
            }
        }
    }

    match parser.triage_rules()? {
        Some(rules) => {
            let plugin = AutoTriageV1Plugin::new(client, repo, rules).dry_run(args.dry_run);
            let report = plugin
                .run()
                .await
                .with_context(|| format!("Plugin {} failed", plugin.name()))?;
            info!(
                plugin = plugin.name(),
                labeled = report.labeled,
                failed = report.failed,
                skipped = report.skipped,
                "Plugin finished"
            );
        }
        None => info!("No autoTriageV1 rule configured"),
    }

    Ok(())
}
