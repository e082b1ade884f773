//! Config pipeline driver
//!
//! Loads a document, resolves references, then extracts label rules. The
//! stages always run in that order: label fields may hold reference tokens
//! that only exist in resolved form after the first stage.

use super::loader::{self, Document};
use super::resolver;
use super::rules::{self, AutoTriageRules, LabelRule, RuleKind};
use crate::error::ConfigError;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default top-level key of the substitution table
pub const DEFAULT_DATA_KEY: &str = "data";

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveReferences,
    ExtractLabelRules,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::ResolveReferences, Stage::ExtractLabelRules];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ResolveReferences => "resolve_references",
            Stage::ExtractLabelRules => "extract_label_rules",
        }
    }
}

/// Owns one config document and the label rules extracted from it
#[derive(Debug, Clone)]
pub struct Parser {
    source: String,
    document: Document,
    data_key: String,
    label_rules: Vec<LabelRule>,
}

impl Parser {
    /// Load the document at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = loader::load_document(path)?;
        Ok(Self::from_document(path.display().to_string(), document))
    }

    /// Parse a document held in memory
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let document = loader::parse_document(content, "<inline>")?;
        Ok(Self::from_document("<inline>".to_string(), document))
    }

    fn from_document(source: String, document: Document) -> Self {
        Self {
            source,
            document,
            data_key: DEFAULT_DATA_KEY.to_string(),
            label_rules: Vec::new(),
        }
    }

    /// Use a different top-level key as the substitution table
    pub fn data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = data_key.into();
        self
    }

    /// Run every stage in order.
    ///
    /// Extracted label rules are appended to those of earlier calls.
    pub fn process(&mut self) -> Result<(), ConfigError> {
        for stage in Stage::ALL {
            debug!(source = %self.source, stage = stage.name(), "Running config stage");
            self.run_stage(stage)?;
        }

        info!(
            source = %self.source,
            label_rules = self.label_rules.len(),
            "Config processed"
        );
        Ok(())
    }

    fn run_stage(&mut self, stage: Stage) -> Result<(), ConfigError> {
        match stage {
            Stage::ResolveReferences => {
                self.document = resolver::resolve(&self.document, &self.data_key);
                for token in resolver::unresolved_references(&self.document) {
                    warn!(source = %self.source, token = %token, "Unresolved reference left as-is");
                }
            }
            Stage::ExtractLabelRules => {
                let extracted = rules::extract_label_rules(&self.document)?;
                self.label_rules.extend(extracted);
            }
        }
        Ok(())
    }

    /// The document, resolved once `process` has run
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Every label rule extracted so far
    pub fn label_rules(&self) -> &[LabelRule] {
        &self.label_rules
    }

    /// First auto triage block of the current document, if any
    pub fn triage_rules(&self) -> Result<Option<AutoTriageRules>, ConfigError> {
        Ok(rules::extract_rules(&self.document)?
            .into_iter()
            .find_map(|rule| match rule {
                RuleKind::AutoTriageV1 { rules, .. } => Some(rules),
                _ => None,
            }))
    }

    /// Render the current document as YAML, for debugging
    pub fn dump(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.document).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
data:
  greeting: hello
  bugColor: d73a4a
rules:
  - name: r1
    label:
      state: open
      title: ${var.greeting}
      color: ${var.bugColor}
"#;

    #[test]
    fn test_process_resolves_before_extracting() {
        let mut parser = Parser::from_yaml(CONFIG).unwrap();
        parser.process().unwrap();

        let rules = parser.label_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "r1");
        assert_eq!(rules[0].title, "hello");
        assert_eq!(rules[0].color.as_deref(), Some("d73a4a"));
        assert_eq!(
            parser.document()["rules"][0]["label"]["title"].as_str(),
            Some("hello")
        );
    }

    #[test]
    fn test_process_twice_accumulates_rules() {
        let mut parser = Parser::from_yaml(CONFIG).unwrap();
        parser.process().unwrap();
        parser.process().unwrap();

        assert_eq!(parser.label_rules().len(), 2);
        assert_eq!(parser.label_rules()[0], parser.label_rules()[1]);
    }

    #[test]
    fn test_missing_name_fails_processing() {
        let mut parser =
            Parser::from_yaml("rules:\n  - label: {state: open, title: x}\n").unwrap();
        assert!(matches!(
            parser.process(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_bad_triage_entry_only_fails_triage_rules() {
        let mut parser = Parser::from_yaml(
            "rules:\n  - autoTriageV1: {enabled: true}\n  - name: bug\n    label: {state: open, title: bug}\n",
        )
        .unwrap();
        parser.process().unwrap();

        assert_eq!(parser.label_rules().len(), 1);
        assert!(parser.triage_rules().is_err());
    }

    #[test]
    fn test_custom_data_key() {
        let mut parser = Parser::from_yaml(
            "values:\n  t: from-values\nrules:\n  - name: r\n    label: {state: open, title: \"${var.t}\"}\n",
        )
        .unwrap()
        .data_key("values");
        parser.process().unwrap();

        assert_eq!(parser.label_rules()[0].title, "from-values");
    }

    #[test]
    fn test_load_from_file_and_dump() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("okazaki.yml");
        fs::write(&file_path, CONFIG).unwrap();

        let mut parser = Parser::new(&file_path).unwrap();
        parser.process().unwrap();

        let dumped = parser.dump().unwrap();
        assert!(dumped.contains("title: hello"));
        assert!(!dumped.contains("${var.greeting}"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = Parser::new(dir.path().join("nope.yml"));
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_triage_rules_after_resolution() {
        let mut parser = Parser::from_yaml(
            r#"
data:
  doneLabel: triage/done
rules:
  - name: triage
    autoTriageV1:
      enabled: true
      triagedLabel: ${var.doneLabel}
      pulls:
        - terms: [docs]
          label: documentation
"#,
        )
        .unwrap();
        parser.process().unwrap();

        let rules = parser.triage_rules().unwrap().unwrap();
        assert_eq!(rules.triaged_label, "triage/done");
        assert_eq!(rules.pulls[0].label, "documentation");
        assert!(parser.label_rules().is_empty());
    }

    #[test]
    fn test_example_config() {
        let mut parser = Parser::from_yaml(include_str!("../../okazaki.example.yml")).unwrap();
        parser.process().unwrap();

        let labels = parser.label_rules();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].title, "kind/bug");
        assert_eq!(labels[0].color.as_deref(), Some("d73a4a"));
        assert_eq!(labels[1].new_title.as_deref(), Some("kind/question"));

        let triage = parser.triage_rules().unwrap().unwrap();
        assert_eq!(triage.triaged_label, "triaged");
        assert_eq!(triage.issues[0].label, "kind/bug");
        assert_eq!(triage.pulls.len(), 1);
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            Stage::ALL.map(|stage| stage.name()),
            ["resolve_references", "extract_label_rules"]
        );
    }
}
