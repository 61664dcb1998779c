//! State container errors

use crate::step::Step;
use arbiter_model::EntityError;

/// Errors raised by state creation and step transitions
///
/// All variants are contract violations by the caller; none is recovered
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Malformed creation arguments
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An entity failed validation while building the state
    #[error("invalid input: {0}")]
    InvalidEntity(#[from] EntityError),

    /// Step change not permitted by the transition table
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current step
        from: Step,
        /// Rejected target step
        to: Step,
    },

    /// Step name outside the fixed enumeration
    #[error("unknown step: {0:?}")]
    UnknownStep(String),

    /// Stage output references data the state does not hold
    #[error("consistency violation: {0}")]
    Consistency(String),
}

impl StateError {
    /// Check if the error stems from malformed input
    #[inline]
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidEntity(_))
    }

    /// Check if the error is a rejected transition
    #[inline]
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Check if the error is a consistency breach
    #[inline]
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        match self {
            Self::Consistency(_) => true,
            Self::InvalidEntity(e) => e.is_consistency(),
            _ => false,
        }
    }
}
