//! Okazaki Triage Bot Library
//!
//! GitHub App automation driven by a YAML rule file.
//!
//! ## Modules
//!
//! - `config`: load the rule file, resolve `${var.<key>}` references against
//!   its `data` section, and extract typed rules
//! - `github`: App authentication, REST calls, issues and labels
//! - `plugins`: rule-driven triage of open issues and pull requests
//! - `ai` (feature `search`): embedding search and chat helpers
//!
//! ## Example Pipeline
//!
//! ```bash
//! triage-bot \
//!   --config okazaki.yml \
//!   --app-id $GITHUB_APP_ID \
//!   --private-key-path /path/to/key.pem \
//!   --installation-id $INSTALLATION_ID \
//!   --repo clivern/okazaki
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod plugins;

#[cfg(feature = "search")]
pub mod ai;

pub use config::Parser;
pub use error::{ApiError, ConfigError};
