//! YAML config loading.

use crate::error::ConfigError;
use std::path::Path;
use tracing::debug;

/// An untyped configuration tree.
///
/// `serde_yaml::Value` is a closed sum of mappings, sequences and scalars,
/// so every pass over the document is a structural match.
pub type Document = serde_yaml::Value;

/// Read and parse a YAML document from disk
pub fn load_document(path: impl AsRef<Path>) -> Result<Document, ConfigError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading config");

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    parse_document(&content, &path.display().to_string())
}

/// Parse YAML text; `source` names the origin in error messages
pub fn parse_document(content: &str, source: &str) -> Result<Document, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::Load {
        path: source.to_string(),
        details: e.to_string(),
    })
}
