//! Error types for Arbiter Core
//!
//! [`PipelineError`] covers contract violations only: malformed input,
//! illegal transitions, broken entity relationships and bad configuration.
//! Collaborator failures never surface here; stages record them into the
//! state's error context instead.

use arbiter_kernel::{StateError, Step};
use arbiter_model::EntityError;

/// Main pipeline error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Malformed arguments to state creation or an entity constructor
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A step change the transition table forbids
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Step the state was in
        from: Step,
        /// Rejected target
        to: Step,
    },

    /// Option/analysis identifiers disagree
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// A stage was handed a state in a step it does not run in
    #[error("stage `{stage}` cannot run in step `{actual}`")]
    StageMismatch {
        /// Step the stage runs in
        stage: Step,
        /// Step the state was in
        actual: Step,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Short category name, used in logs
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Consistency(_) => "consistency_error",
            Self::StageMismatch { .. } => "stage_mismatch",
            Self::Config(_) => "config_error",
        }
    }

    /// Contract violations are never retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<StateError> for PipelineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InvalidInput(msg) => Self::InvalidInput(msg),
            StateError::InvalidEntity(e) => e.into(),
            StateError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            StateError::UnknownStep(name) => Self::InvalidInput(format!("unknown step: {name:?}")),
            StateError::Consistency(msg) => Self::Consistency(msg),
        }
    }
}

impl From<EntityError> for PipelineError {
    fn from(err: EntityError) -> Self {
        if err.is_consistency() {
            Self::Consistency(err.to_string())
        } else {
            Self::InvalidInput(err.to_string())
        }
    }
}
