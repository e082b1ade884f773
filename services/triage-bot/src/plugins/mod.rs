//! Triage plugins
//!
//! Each plugin runs against one repository with rules taken from the
//! resolved configuration.

pub mod auto_triage;

pub use auto_triage::AutoTriageV1Plugin;

use crate::error::ApiError;
use async_trait::async_trait;
use serde::Serialize;

/// Counters reported by a plugin run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Items that received labels
    pub labeled: usize,
    /// Items whose labeling failed
    pub failed: usize,
    /// Items already triaged
    pub skipped: usize,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<RunReport, ApiError>;
}
