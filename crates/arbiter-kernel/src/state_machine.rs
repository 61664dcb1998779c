//! Transition table
//!
//! | from | allowed to |
//! |---|---|
//! | `option_finder` | `pros_cons`, `error` |
//! | `pros_cons` | `decision`, `error` |
//! | `decision` | `complete`, `error` |
//! | `error` | `option_finder`, `pros_cons`, `decision` |
//! | `complete` | none |
//!
//! Recovery never re-enters `complete` directly: a failed run must redo the
//! decision stage to finish.

use crate::error::StateError;
use crate::step::Step;

/// Steps reachable from `from`, in table order
#[must_use]
pub const fn allowed_transitions(from: Step) -> &'static [Step] {
    use Step::*;
    match from {
        OptionFinder => &[ProsCons, Error],
        ProsCons => &[Decision, Error],
        Decision => &[Complete, Error],
        Error => &[OptionFinder, ProsCons, Decision],
        Complete => &[],
    }
}

/// Check a transition without producing an error value
#[inline]
#[must_use]
pub fn is_allowed(from: Step, to: Step) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Validate a transition
///
/// # Errors
/// Returns [`StateError::InvalidTransition`] if the table forbids `from -> to`
pub fn validate_transition(from: Step, to: Step) -> Result<(), StateError> {
    if is_allowed(from, to) {
        Ok(())
    } else {
        Err(StateError::InvalidTransition { from, to })
    }
}

/// Validate a transition given by step names
///
/// Total over all strings: an unknown name on either side yields `false`.
#[must_use]
pub fn validate_state_transition(current_step: &str, next_step: &str) -> bool {
    match (current_step.parse::<Step>(), next_step.parse::<Step>()) {
        (Ok(from), Ok(to)) => is_allowed(from, to),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_edges() {
        assert!(validate_transition(Step::OptionFinder, Step::ProsCons).is_ok());
        assert!(validate_transition(Step::ProsCons, Step::Decision).is_ok());
        assert!(validate_transition(Step::Decision, Step::Complete).is_ok());
    }

    #[test]
    fn no_stage_skipping() {
        assert!(validate_transition(Step::OptionFinder, Step::Decision).is_err());
        assert!(validate_transition(Step::OptionFinder, Step::Complete).is_err());
        assert!(validate_transition(Step::ProsCons, Step::Complete).is_err());
    }

    #[test]
    fn no_self_loops() {
        for step in Step::ALL {
            assert!(!is_allowed(step, step), "{step} -> {step}");
        }
    }

    #[test]
    fn error_recovers_into_working_steps_only() {
        assert_eq!(allowed_transitions(Step::Error), &Step::WORKING[..]);
        assert!(validate_transition(Step::Error, Step::Complete).is_err());
    }

    #[test]
    fn complete_is_absorbing() {
        assert!(allowed_transitions(Step::Complete).is_empty());
        assert!(validate_transition(Step::Complete, Step::Error).is_err());
    }

    #[test]
    fn named_validation_is_total() {
        assert!(validate_state_transition("option_finder", "pros_cons"));
        assert!(!validate_state_transition("option_finder", "decision"));
        assert!(!validate_state_transition("nonexistent", "error"));
        assert!(!validate_state_transition("error", "nonexistent"));
        assert!(!validate_state_transition("", ""));
    }
}
