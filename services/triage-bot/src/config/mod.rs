//! Rule configuration
//!
//! - `loader`: YAML document loading
//! - `resolver`: `${var.<key>}` reference substitution
//! - `rules`: typed rule extraction
//! - `parser`: the pipeline tying them together

pub mod loader;
pub mod parser;
pub mod resolver;
pub mod rules;

pub use loader::{load_document, Document};
pub use parser::{Parser, DEFAULT_DATA_KEY};
pub use resolver::{resolve, unresolved_references};
pub use rules::{
    extract_label_rules, extract_rules, AutoTriageRules, LabelRule, RuleKind, TermRule,
};
