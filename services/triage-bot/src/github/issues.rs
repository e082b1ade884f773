//! Issue and pull request operations.

use super::client::GitHubClient;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Page size used when listing issues
pub const PER_PAGE: usize = 100;

/// Label attached to an issue
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueLabel {
    pub name: String,
}

/// An issue or pull request as returned by the issues endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    /// Present only on pull requests
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|label| label.name.as_str()).collect()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Listing and labeling of repository items
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// All issues and pull requests of `repo` (`owner/name`) in `state`
    async fn list_issues(&self, repo: &str, state: &str) -> Result<Vec<Issue>, ApiError>;

    /// Add `labels` to item `number`
    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), ApiError>;
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn list_issues(&self, repo: &str, state: &str) -> Result<Vec<Issue>, ApiError> {
        let mut issues = Vec::new();

        for page in 1.. {
            let path = format!(
                "/repos/{}/issues?state={}&per_page={}&page={}",
                repo, state, PER_PAGE, page
            );
            let value = self.get(&path).await?;
            let batch: Vec<Issue> =
                serde_json::from_value(value).map_err(|e| ApiError::decode(&self.url(&path), e))?;

            let count = batch.len();
            issues.extend(batch);
            debug!(repo = %repo, page, count, "Fetched issue page");

            if count < PER_PAGE {
                break;
            }
        }

        Ok(issues)
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), ApiError> {
        let path = format!("/repos/{}/issues/{}/labels", repo, number);
        self.post(&path, Some(&json!({ "labels": labels }))).await?;
        Ok(())
    }
}
