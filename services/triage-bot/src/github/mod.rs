//! GitHub API access
//!
//! - `auth`: App JWTs and installation tokens
//! - `client`: bearer-authenticated REST calls
//! - `issues`: listing and labeling issues and pull requests
//! - `labels`: repository label management

pub mod auth;
pub mod client;
pub mod issues;
pub mod labels;

pub use auth::{is_token_expired, GitHubApp, InstallationToken};
pub use client::{GitHubClient, GITHUB_API};
pub use issues::{Issue, IssueTracker};
pub use labels::{Label, LabelState, LabelSyncOutcome};
