//! Pipeline configuration
//!
//! A [`PipelineConfig`] is a plain value handed to the orchestrator and the
//! reference collaborators. Every field has a default, so an empty TOML file
//! parses to [`PipelineConfig::default`].
//!
//! ```toml
//! [retrieval]
//! top_k = 5
//! min_similarity = 0.0
//!
//! [generation]
//! command = "llm -m gemini-2.5-flash"
//! timeout_secs = 60
//! max_retries = 3
//! retry_delay_ms = 1000
//! max_retry_delay_ms = 60000
//!
//! [analysis]
//! concurrency = 1
//! default_confidence = 5.0
//!
//! [decision]
//! min_score = 0.0
//! max_recommendations = 5
//! ```

use crate::error::PipelineError;
use arbiter_model::{CONFIDENCE_MAX, CONFIDENCE_MIN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Option-finding settings
    pub retrieval: RetrievalConfig,
    /// Language-generation settings
    pub generation: GenerationConfig,
    /// Pros/cons settings
    pub analysis: AnalysisConfig,
    /// Ranking settings
    pub decision: DecisionConfig,
}

/// Option-finding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of options kept
    pub top_k: usize,
    /// Candidates scoring below this similarity are discarded
    pub min_similarity: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.0,
        }
    }
}

/// Language-generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Shell command the prompt is piped into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Per-call timeout
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff delay
    pub retry_delay_ms: u64,
    /// Backoff ceiling
    pub max_retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: 60,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 60_000,
        }
    }
}

impl GenerationConfig {
    /// Per-call timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base backoff delay as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Backoff ceiling as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }
}

/// Pros/cons settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analyses in flight at once; 1 runs them sequentially
    pub concurrency: usize,
    /// Confidence used when a response does not state one
    pub default_confidence: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            default_confidence: 5.0,
        }
    }
}

/// Ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Recommendations scoring below this are dropped
    pub min_score: f64,
    /// Length cap on the ranking
    pub max_recommendations: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            max_recommendations: 5,
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With option cap
    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.retrieval.top_k = top_k;
        self
    }

    /// With similarity threshold
    #[inline]
    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.retrieval.min_similarity = min_similarity;
        self
    }

    /// With analysis fan-out
    #[inline]
    #[must_use]
    pub fn with_analysis_concurrency(mut self, concurrency: usize) -> Self {
        self.analysis.concurrency = concurrency;
        self
    }

    /// With generator command
    #[inline]
    #[must_use]
    pub fn with_generator_command(mut self, command: impl Into<String>) -> Self {
        self.generation.command = Some(command.into());
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`] naming the first invalid field
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.retrieval.top_k < 1 {
            return Err(config_error("retrieval.top_k must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_similarity) {
            return Err(config_error("retrieval.min_similarity must be in [0.0, 1.0]"));
        }
        if self.analysis.concurrency < 1 {
            return Err(config_error("analysis.concurrency must be >= 1"));
        }
        if !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&self.analysis.default_confidence) {
            return Err(config_error("analysis.default_confidence must be in [0.0, 10.0]"));
        }
        if !(self.decision.min_score.is_finite() && self.decision.min_score >= 0.0) {
            return Err(config_error("decision.min_score must be >= 0"));
        }
        if self.decision.max_recommendations < 1 {
            return Err(config_error("decision.max_recommendations must be >= 1"));
        }
        if self.generation.retry_delay_ms > self.generation.max_retry_delay_ms {
            return Err(config_error(
                "generation.retry_delay_ms must not exceed generation.max_retry_delay_ms",
            ));
        }
        if let Some(command) = &self.generation.command {
            if command.trim().is_empty() {
                return Err(config_error("generation.command must not be blank"));
            }
        }
        Ok(())
    }
}

fn config_error(msg: &str) -> PipelineError {
    PipelineError::Config(msg.to_string())
}

/// Parse and validate configuration from TOML text
///
/// # Errors
/// Returns [`PipelineError::Config`] on syntax errors or invalid values
pub fn parse_config(content: &str) -> Result<PipelineConfig, PipelineError> {
    let config: PipelineConfig = toml::from_str(content)
        .map_err(|e| PipelineError::Config(format!("failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a TOML configuration file
///
/// # Errors
/// Returns [`PipelineError::Config`] if the file cannot be read, parsed or
/// validated
pub fn load_config(path: &Path) -> Result<PipelineConfig, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
