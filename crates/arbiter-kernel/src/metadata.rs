//! Processing metadata carried alongside the workflow

use arbiter_model::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Workflow version tag stamped on every new state
pub const WORKFLOW_VERSION: &str = "1.0";

/// Well-known counter names
pub mod counter {
    /// Options kept by the option-finding stage
    pub const OPTIONS_FOUND: &str = "options_found";
    /// Retrieval candidates dropped (invalid or below threshold)
    pub const CANDIDATES_REJECTED: &str = "candidates_rejected";
    /// Analyses produced from a successful generation call
    pub const ANALYSES_COMPLETED: &str = "analyses_completed";
    /// Degraded analyses recording a per-option failure
    pub const ANALYSES_FAILED: &str = "analyses_failed";
    /// Recommendations in the final ranking
    pub const RECOMMENDATIONS_RANKED: &str = "recommendations_ranked";
}

/// Counters, timings and a version tag for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Workflow version tag
    pub workflow_version: String,
    /// Number of uploaded documents
    pub total_documents: usize,
    /// Identifier of this run
    pub run_id: Uuid,
    /// When the orchestrator first started driving the state
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When the orchestrator last returned the state
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Named counters, see [`counter`]
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
    /// Open key/value bag
    #[serde(default)]
    pub extra: Metadata,
}

impl ProcessingMetadata {
    /// Fresh metadata for a run over `total_documents` documents
    #[must_use]
    pub fn new(total_documents: usize) -> Self {
        Self {
            workflow_version: WORKFLOW_VERSION.to_string(),
            total_documents,
            run_id: Uuid::new_v4(),
            started_at: None,
            finished_at: None,
            counters: BTreeMap::new(),
            extra: Metadata::new(),
        }
    }

    /// Counter value, zero when never recorded
    #[inline]
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Set a counter
    #[inline]
    pub fn set_counter(&mut self, name: &str, value: u64) {
        self.counters.insert(name.to_string(), value);
    }
}
