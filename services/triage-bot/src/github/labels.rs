//! Repository label management
//!
//! Applies [`LabelRule`]s from the rule configuration. The rule `state`
//! selects the action:
//! - `present`: create the label when missing
//! - `absent`: delete the label when it exists
//! - `updated`: rename/recolor/redescribe via the `new_*` fields

use super::client::GitHubClient;
use crate::config::LabelRule;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

/// A repository label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Desired state named by a label rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState {
    Present,
    Absent,
    Updated,
}

impl LabelState {
    pub fn parse(state: &str) -> Option<Self> {
        match state.trim().to_ascii_lowercase().as_str() {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

/// What syncing a label rule did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSyncOutcome {
    Created,
    Updated,
    Deleted,
    Unchanged,
    /// The rule's state is not recognized
    Skipped,
}

/// GitHub expects colors without the leading `#`
fn normalize_color(color: &str) -> String {
    color.trim_start_matches('#').to_string()
}

fn label_path(repo: &str, name: &str) -> String {
    format!("/repos/{}/labels/{}", repo, urlencoding::encode(name))
}

/// Request body for an `updated` rule; empty when nothing would change
fn update_body(rule: &LabelRule) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(title) = &rule.new_title {
        body.insert("new_name".to_string(), json!(title));
    }
    if let Some(color) = &rule.new_color {
        body.insert("color".to_string(), json!(normalize_color(color)));
    }
    if let Some(description) = &rule.new_description {
        body.insert("description".to_string(), json!(description));
    }
    body
}

impl GitHubClient {
    /// Fetch a label, `None` when the repository has no such label
    pub async fn get_label(&self, repo: &str, name: &str) -> Result<Option<Label>, ApiError> {
        let path = label_path(repo, name);
        match self.get(&path).await {
            Ok(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::decode(&self.url(&path), e)),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn create_label(
        &self,
        repo: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
    ) -> Result<Label, ApiError> {
        let path = format!("/repos/{}/labels", repo);
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        if let Some(color) = color {
            body.insert("color".to_string(), json!(normalize_color(color)));
        }
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }

        let value = self.post(&path, Some(&Value::Object(body))).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&self.url(&path), e))
    }

    pub async fn update_label(
        &self,
        repo: &str,
        name: &str,
        changes: Map<String, Value>,
    ) -> Result<Label, ApiError> {
        let path = label_path(repo, name);
        let value = self.patch(&path, Some(&Value::Object(changes))).await?;
        serde_json::from_value(value).map_err(|e| ApiError::decode(&self.url(&path), e))
    }

    pub async fn delete_label(&self, repo: &str, name: &str) -> Result<(), ApiError> {
        self.delete(&label_path(repo, name)).await?;
        Ok(())
    }

    /// Bring the repository in line with one label rule
    pub async fn sync_label_rule(
        &self,
        repo: &str,
        rule: &LabelRule,
    ) -> Result<LabelSyncOutcome, ApiError> {
        let Some(state) = LabelState::parse(&rule.state) else {
            warn!(rule = %rule.name, state = %rule.state, "Unknown label state, skipping rule");
            return Ok(LabelSyncOutcome::Skipped);
        };

        let existing = self.get_label(repo, &rule.title).await?;

        let outcome = match (state, existing) {
            (LabelState::Present, None) => {
                self.create_label(
                    repo,
                    &rule.title,
                    rule.color.as_deref(),
                    rule.description.as_deref(),
                )
                .await?;
                LabelSyncOutcome::Created
            }
            (LabelState::Absent, Some(_)) => {
                self.delete_label(repo, &rule.title).await?;
                LabelSyncOutcome::Deleted
            }
            (LabelState::Updated, Some(_)) => {
                let changes = update_body(rule);
                if changes.is_empty() {
                    LabelSyncOutcome::Unchanged
                } else {
                    self.update_label(repo, &rule.title, changes).await?;
                    LabelSyncOutcome::Updated
                }
            }
            (LabelState::Updated, None) => {
                warn!(rule = %rule.name, label = %rule.title, "Label to update does not exist");
                LabelSyncOutcome::Unchanged
            }
            (LabelState::Present, Some(_)) | (LabelState::Absent, None) => {
                LabelSyncOutcome::Unchanged
            }
        };

        info!(rule = %rule.name, label = %rule.title, outcome = ?outcome, "Synced label rule");
        Ok(outcome)
    }
}
