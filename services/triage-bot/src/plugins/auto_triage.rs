//! Auto Triage Plugin V1
//!
//! Labels open issues and pull requests whose title or body contains one of
//! the configured terms, then marks them with the triaged label so later runs
//! leave them alone. A labeling failure is logged and the run moves on to the
//! next item.

use super::{Plugin, RunReport};
use crate::config::{AutoTriageRules, TermRule};
use crate::error::ApiError;
use crate::github::{Issue, IssueTracker};
use async_trait::async_trait;
use tracing::{error, info};

/// Which kind of item a pass handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    fn matches(&self, item: &Issue) -> bool {
        match self {
            ItemKind::Issue => !item.is_pull_request(),
            ItemKind::PullRequest => item.is_pull_request(),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Issue => write!(f, "issue"),
            ItemKind::PullRequest => write!(f, "pull request"),
        }
    }
}

/// Labels whose rule terms occur in `title` or `body`, case-insensitively.
///
/// Rule order is kept and each label appears once. Blank terms never match.
pub fn match_labels(rules: &[TermRule], title: &str, body: &str) -> Vec<String> {
    let title = title.to_lowercase();
    let body = body.to_lowercase();
    let mut labels: Vec<String> = Vec::new();

    for rule in rules {
        let hit = rule
            .terms
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .any(|term| title.contains(&term) || body.contains(&term));

        if hit && !labels.contains(&rule.label) {
            labels.push(rule.label.clone());
        }
    }

    labels
}

pub struct AutoTriageV1Plugin<T: IssueTracker> {
    tracker: T,
    repo: String,
    rules: AutoTriageRules,
    dry_run: bool,
}

impl<T: IssueTracker> AutoTriageV1Plugin<T> {
    pub fn new(tracker: T, repo: impl Into<String>, rules: AutoTriageRules) -> Self {
        Self {
            tracker,
            repo: repo.into(),
            rules,
            dry_run: false,
        }
    }

    /// Log matches without applying labels
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    async fn process_items(&self, items: &[Issue], kind: ItemKind, report: &mut RunReport) {
        let rules = match kind {
            ItemKind::Issue => &self.rules.issues,
            ItemKind::PullRequest => &self.rules.pulls,
        };

        for item in items.iter().filter(|item| kind.matches(item)) {
            if item.has_label(&self.rules.triaged_label) {
                report.skipped += 1;
                continue;
            }

            let mut labels = match_labels(rules, &item.title, item.body());
            if labels.is_empty() {
                continue;
            }
            labels.push(self.rules.triaged_label.clone());

            if self.dry_run {
                info!(
                    repo = %self.repo,
                    number = item.number,
                    labels = ?labels,
                    "Dry run: would add labels to {}", kind
                );
                report.labeled += 1;
                continue;
            }

            match self.tracker.add_labels(&self.repo, item.number, &labels).await {
                Ok(()) => {
                    info!(
                        repo = %self.repo,
                        number = item.number,
                        labels = ?labels,
                        "Added labels to {}", kind
                    );
                    report.labeled += 1;
                }
                Err(e) => {
                    error!(
                        repo = %self.repo,
                        number = item.number,
                        labels = ?labels,
                        error = %e,
                        "Failed to add labels to {}", kind
                    );
                    report.failed += 1;
                }
            }
        }
    }
}

#[async_trait]
impl<T: IssueTracker> Plugin for AutoTriageV1Plugin<T> {
    fn name(&self) -> &'static str {
        "auto_triage_v1"
    }

    async fn run(&self) -> Result<RunReport, ApiError> {
        let mut report = RunReport::default();

        if !self.rules.enabled {
            info!(repo = %self.repo, "Auto Triage V1 Plugin is disabled. Skipping.");
            return Ok(report);
        }

        let items = self.tracker.list_issues(&self.repo, "open").await?;

        self.process_items(&items, ItemKind::Issue, &mut report).await;
        self.process_items(&items, ItemKind::PullRequest, &mut report).await;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::issues::IssueLabel;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTracker {
        items: Vec<Issue>,
        failing: Vec<u64>,
        applied: Mutex<Vec<(u64, Vec<String>)>>,
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn list_issues(&self, _repo: &str, state: &str) -> Result<Vec<Issue>, ApiError> {
            assert_eq!(state, "open");
            Ok(self.items.clone())
        }

        async fn add_labels(
            &self,
            _repo: &str,
            number: u64,
            labels: &[String],
        ) -> Result<(), ApiError> {
            if self.failing.contains(&number) {
                return Err(ApiError::Status {
                    url: format!("/issues/{}/labels", number),
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.applied
                .lock()
                .unwrap()
                .push((number, labels.to_vec()));
            Ok(())
        }
    }

    fn item(number: u64, title: &str, body: Option<&str>, labels: &[&str], pull: bool) -> Issue {
        Issue {
            number,
            title: title.to_string(),
            body: body.map(str::to_string),
            labels: labels
                .iter()
                .map(|name| IssueLabel {
                    name: name.to_string(),
                })
                .collect(),
            pull_request: pull.then(|| serde_json::json!({})),
        }
    }

    fn term_rule(terms: &[&str], label: &str) -> TermRule {
        TermRule {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            label: label.to_string(),
        }
    }

    fn rules() -> AutoTriageRules {
        AutoTriageRules {
            enabled: true,
            triaged_label: "triaged".to_string(),
            issues: vec![
                term_rule(&["crash", "panic"], "bug"),
                term_rule(&["feature"], "enhancement"),
            ],
            pulls: vec![term_rule(&["docs"], "documentation")],
        }
    }

    #[test]
    fn test_match_labels() {
        let rules = rules().issues;
        assert_eq!(match_labels(&rules, "App CRASHES on start", ""), vec!["bug"]);
        assert_eq!(
            match_labels(&rules, "Feature request", "it panics too"),
            vec!["bug", "enhancement"]
        );
        assert!(match_labels(&rules, "Question", "how do I?").is_empty());
    }

    #[test]
    fn test_match_labels_dedups_and_ignores_blank_terms() {
        let rules = vec![
            term_rule(&["", "  "], "everything"),
            term_rule(&["bug"], "bug"),
            term_rule(&["error"], "bug"),
        ];
        assert_eq!(match_labels(&rules, "bug with error", ""), vec!["bug"]);
        assert!(match_labels(&rules, "unrelated", "").is_empty());
    }

    #[tokio::test]
    async fn test_run_labels_issues_and_pulls_separately() {
        let tracker = FakeTracker {
            items: vec![
                item(1, "Crash on login", None, &[], false),
                item(2, "Update docs", Some("typo"), &[], true),
                item(3, "docs for crash", None, &[], false),
                item(4, "Crash again", None, &["triaged"], false),
                item(5, "Nothing here", Some(""), &[], false),
            ],
            ..Default::default()
        };

        let plugin = AutoTriageV1Plugin::new(tracker, "o/r", rules());
        let report = plugin.run().await.unwrap();

        assert_eq!(report.labeled, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let applied = plugin.tracker.applied.lock().unwrap();
        assert_eq!(
            *applied,
            vec![
                (1, vec!["bug".to_string(), "triaged".to_string()]),
                (3, vec!["bug".to_string(), "triaged".to_string()]),
                (2, vec!["documentation".to_string(), "triaged".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_run() {
        let tracker = FakeTracker {
            items: vec![
                item(1, "panic", None, &[], false),
                item(2, "crash", None, &[], false),
            ],
            failing: vec![1],
            ..Default::default()
        };

        let plugin = AutoTriageV1Plugin::new(tracker, "o/r", rules());
        let report = plugin.run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.labeled, 1);
        assert_eq!(plugin.tracker.applied.lock().unwrap()[0].0, 2);
    }

    #[tokio::test]
    async fn test_disabled_plugin_does_nothing() {
        let tracker = FakeTracker {
            items: vec![item(1, "crash", None, &[], false)],
            ..Default::default()
        };
        let mut disabled = rules();
        disabled.enabled = false;

        let plugin = AutoTriageV1Plugin::new(tracker, "o/r", disabled);
        let report = plugin.run().await.unwrap();

        assert_eq!(report, RunReport::default());
        assert!(plugin.tracker.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_applies_nothing() {
        let tracker = FakeTracker {
            items: vec![item(1, "crash", None, &[], false)],
            ..Default::default()
        };

        let plugin = AutoTriageV1Plugin::new(tracker, "o/r", rules()).dry_run(true);
        let report = plugin.run().await.unwrap();

        assert_eq!(report.labeled, 1);
        assert!(plugin.tracker.applied.lock().unwrap().is_empty());
    }
}
