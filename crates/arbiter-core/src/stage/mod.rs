//! Pipeline stages
//!
//! A stage runs in exactly one working step. Given a state in that step it
//! returns a new state that is either in the step's successor with the
//! stage's output committed, or in `error` with a populated error context.
//! Collaborator failures take the second path; `Err` is reserved for
//! contract violations.

mod decision;
mod option_finder;
mod pros_cons;

pub use decision::{option_score, DecisionStage};
pub use option_finder::OptionFinderStage;
pub use pros_cons::ProsConsStage;

use crate::error::PipelineError;
use arbiter_kernel::{AgentState, Step};
use async_trait::async_trait;

/// `error_type` recorded when retrieval fails
pub const RETRIEVAL_ERROR: &str = "retrieval_error";
/// `error_type` recorded when generation fails
pub const GENERATION_ERROR: &str = "generation_error";
/// `error_type` recorded when retrieval yields no usable option
pub const NO_OPTIONS: &str = "no_options";
/// `error_type` recorded when there is nothing to rank
pub const NO_ANALYSES: &str = "no_analyses";

/// One unit of pipeline work
#[async_trait]
pub trait Stage: Send + Sync {
    /// The working step this stage runs in
    fn step(&self) -> Step;

    /// Name used in logs
    fn name(&self) -> &'static str {
        self.step().as_str()
    }

    /// Run the stage on `state`
    ///
    /// # Errors
    /// Returns [`PipelineError`] only for contract violations: a state in
    /// the wrong step, an illegal transition or inconsistent output
    async fn run(&self, state: AgentState) -> Result<AgentState, PipelineError>;
}

/// Reject a state that is not in `stage`'s step
pub(crate) fn ensure_step(stage: Step, state: &AgentState) -> Result<(), PipelineError> {
    if state.current_step() == stage {
        Ok(())
    } else {
        Err(PipelineError::StageMismatch {
            stage,
            actual: state.current_step(),
        })
    }
}

/// Move a state out of `stage` along the happy path
pub(crate) fn advance_past(stage: Step, state: &AgentState) -> Result<AgentState, PipelineError> {
    let next = stage
        .successor()
        .ok_or_else(|| PipelineError::Consistency(format!("`{stage}` has no successor step")))?;
    Ok(state.advance(next)?)
}
