//! Error types for configuration processing and collaborator APIs.

use thiserror::Error;

/// Errors raised while loading or interpreting the rule configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing, unreadable, or not valid YAML
    #[error("Failed to load config {path}: {details}")]
    Load { path: String, details: String },

    /// A recognized rule block lacks a required field
    #[error("Rule {rule} is missing required field '{field}'")]
    MissingField { rule: String, field: String },

    /// A field is present but has an unusable shape
    #[error("Rule {rule} has an invalid '{field}': {details}")]
    InvalidField {
        rule: String,
        field: String,
        details: String,
    },

    /// The resolved document could not be written back to YAML
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Errors raised by the GitHub, embedding and vector store clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("Error while calling {url}: {details}")]
    Request { url: String, details: String },

    /// The API answered with a non-2xx status
    #[error("Error while calling {url} (status: {status}), response: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not what we expected
    #[error("Failed to decode response from {url}: {details}")]
    Decode { url: String, details: String },

    /// Building app credentials failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The embedding API failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector store failed
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// A prompt template failed to render
    #[error("Template '{template}' failed to render: {details}")]
    Template { template: String, details: String },
}

impl ApiError {
    pub(crate) fn request(url: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Request {
            url: url.to_string(),
            details: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Decode {
            url: url.to_string(),
            details: err.to_string(),
        }
    }

    /// HTTP status of the failed call, if the API responded
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
