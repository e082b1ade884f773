//! Rule extraction
//!
//! Turns entries of the top-level `rules` sequence into typed records. The
//! sub-key present on an entry selects its kind; entries with no known
//! sub-key are kept as [`RuleKind::Unknown`] so new kinds never break
//! extraction of existing ones.

use super::loader::Document;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Top-level key holding the rule list
pub const RULES_KEY: &str = "rules";

/// Sub-key selecting a label rule
pub const LABEL_KEY: &str = "label";

/// Sub-key selecting the auto triage plugin rules
pub const AUTO_TRIAGE_V1_KEY: &str = "autoTriageV1";

/// A label to create, update or remove in a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRule {
    pub name: String,
    pub state: String,
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub new_title: Option<String>,
    pub new_color: Option<String>,
    pub new_description: Option<String>,
}

/// Keyword rule: any matching term applies `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRule {
    #[serde(default)]
    pub terms: Vec<String>,
    pub label: String,
}

/// Settings of the auto triage plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTriageRules {
    #[serde(default)]
    pub enabled: bool,
    /// Label marking an item as already triaged
    #[serde(default = "default_triaged_label")]
    pub triaged_label: String,
    #[serde(default)]
    pub issues: Vec<TermRule>,
    #[serde(default)]
    pub pulls: Vec<TermRule>,
}

fn default_triaged_label() -> String {
    "triaged".to_string()
}

impl Default for AutoTriageRules {
    fn default() -> Self {
        Self {
            enabled: false,
            triaged_label: default_triaged_label(),
            issues: Vec::new(),
            pulls: Vec::new(),
        }
    }
}

/// A typed entry of the `rules` sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Label(LabelRule),
    AutoTriageV1 { name: String, rules: AutoTriageRules },
    Unknown,
}

/// Classify and build every entry of the `rules` sequence
pub fn extract_rules(document: &Document) -> Result<Vec<RuleKind>, ConfigError> {
    rule_entries(document)?
        .iter()
        .enumerate()
        .map(|(index, entry)| classify_rule(index, entry))
        .collect()
}

/// Build only the label rules, in document order.
///
/// Entries without a `label` key are never inspected.
pub fn extract_label_rules(document: &Document) -> Result<Vec<LabelRule>, ConfigError> {
    let mut rules = Vec::new();
    for (index, entry) in rule_entries(document)?.iter().enumerate() {
        let Some(entry) = entry.as_mapping() else {
            continue;
        };
        if let Some(block) = entry.get(LABEL_KEY) {
            rules.push(label_rule(rule_name(index, entry)?, block)?);
        }
    }
    Ok(rules)
}

fn rule_entries(document: &Document) -> Result<&[Value], ConfigError> {
    match document.get(RULES_KEY) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(entries)) => Ok(entries),
        Some(_) => Err(ConfigError::InvalidField {
            rule: "<root>".to_string(),
            field: RULES_KEY.to_string(),
            details: "expected a sequence".to_string(),
        }),
    }
}

fn classify_rule(index: usize, entry: &Value) -> Result<RuleKind, ConfigError> {
    let Some(entry) = entry.as_mapping() else {
        return Ok(RuleKind::Unknown);
    };

    if let Some(block) = entry.get(LABEL_KEY) {
        let name = rule_name(index, entry)?;
        return label_rule(name, block).map(RuleKind::Label);
    }

    if let Some(block) = entry.get(AUTO_TRIAGE_V1_KEY) {
        let name = rule_name(index, entry)?;
        let rules = serde_yaml::from_value(block.clone()).map_err(|e| {
            ConfigError::InvalidField {
                rule: name.clone(),
                field: AUTO_TRIAGE_V1_KEY.to_string(),
                details: e.to_string(),
            }
        })?;
        return Ok(RuleKind::AutoTriageV1 { name, rules });
    }

    Ok(RuleKind::Unknown)
}

fn rule_name(index: usize, entry: &Mapping) -> Result<String, ConfigError> {
    let position = format!("#{}", index);
    required(entry, "name", &position)
}

fn label_rule(name: String, block: &Value) -> Result<LabelRule, ConfigError> {
    let Some(block) = block.as_mapping() else {
        return Err(ConfigError::InvalidField {
            rule: name,
            field: LABEL_KEY.to_string(),
            details: "expected a mapping".to_string(),
        });
    };

    Ok(LabelRule {
        state: required(block, "state", &name)?,
        title: required(block, "title", &name)?,
        description: optional(block, "description", &name)?,
        color: optional(block, "color", &name)?,
        new_title: optional(block, "new_title", &name)?,
        new_color: optional(block, "new_color", &name)?,
        new_description: optional(block, "new_description", &name)?,
        name,
    })
}

fn required(block: &Mapping, field: &str, rule: &str) -> Result<String, ConfigError> {
    optional(block, field, rule)?.ok_or_else(|| ConfigError::MissingField {
        rule: rule.to_string(),
        field: field.to_string(),
    })
}

/// Scalars are read as text; null and absent both mean unset
fn optional(block: &Mapping, field: &str, rule: &str) -> Result<Option<String>, ConfigError> {
    match block.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(ConfigError::InvalidField {
            rule: rule.to_string(),
            field: field.to_string(),
            details: "expected a scalar".to_string(),
        }),
    }
}
