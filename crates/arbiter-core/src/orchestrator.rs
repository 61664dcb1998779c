//! The orchestrator drives a state through the stages
//!
//! # Workflow
//! 1. Look up the stage for the state's current working step
//! 2. Run it and check the step change against the transition table
//! 3. Repeat until the state is `complete` or `error`
//!
//! A state in `error` is never resumed implicitly. Callers re-enter by
//! advancing it to the failed step themselves or through
//! [`Orchestrator::retry`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::generation::Generator;
use crate::retrieval::Retriever;
use crate::stage::{DecisionStage, OptionFinderStage, ProsConsStage, Stage};
use arbiter_kernel::{validate_transition, AgentState, ErrorContext, ProcessingMetadata, Step};
use arbiter_model::{Document, Recommendation};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Processing metadata key naming the step the last retry re-entered
pub const RETRIED_STEP: &str = "retried_step";

/// What a caller gets back from [`Orchestrator::submit`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    /// Ranked recommendations, possibly partial when the run failed late
    pub recommendations: Vec<Recommendation>,
    /// `complete` or `error`
    pub final_step: Step,
    /// Diagnostics when `final_step` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorContext>,
    /// Counters and timings of the run
    pub metadata: ProcessingMetadata,
}

impl SubmitOutcome {
    /// Summarise a finished state
    #[must_use]
    pub fn from_state(state: &AgentState) -> Self {
        Self {
            recommendations: state.recommendations().to_vec(),
            final_step: state.current_step(),
            error: if state.current_step() == Step::Error {
                state.error_context().cloned()
            } else {
                None
            },
            metadata: state.processing_metadata().clone(),
        }
    }

    /// Whether the run reached `complete`
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.final_step.is_terminal()
    }
}

/// Runs stages in order over an [`AgentState`]
pub struct Orchestrator {
    config: PipelineConfig,
    stages: Vec<Arc<dyn Stage>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("stages", &names)
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the standard stages
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`] if `config` fails validation
    pub fn new(
        config: PipelineConfig,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, PipelineError> {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(OptionFinderStage::new(retriever, &config.retrieval)),
            Arc::new(ProsConsStage::new(Arc::clone(&generator), &config.analysis)),
            Arc::new(DecisionStage::new(generator, &config.decision)),
        ];
        Self::with_stages(config, stages)
    }

    /// Create with custom stages
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`] if `config` fails validation or the
    /// stages do not cover each working step exactly once
    pub fn with_stages(
        config: PipelineConfig,
        stages: Vec<Arc<dyn Stage>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        for step in Step::WORKING {
            let count = stages.iter().filter(|s| s.step() == step).count();
            if count != 1 {
                return Err(PipelineError::Config(format!(
                    "expected exactly one stage for `{step}`, found {count}"
                )));
            }
        }
        if let Some(extra) = stages.iter().find(|s| !s.step().is_working()) {
            return Err(PipelineError::Config(format!(
                "stage `{}` does not run in a working step",
                extra.name()
            )));
        }
        Ok(Self { config, stages })
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn stage_for(&self, step: Step) -> Option<&Arc<dyn Stage>> {
        self.stages.iter().find(|s| s.step() == step)
    }

    /// Drive `state` from its current step until `complete` or `error`
    ///
    /// A state already in `complete` or `error` is returned unchanged.
    ///
    /// # Errors
    /// Returns [`PipelineError`] if a stage reports a contract violation or
    /// moves the state to a step the table forbids
    pub async fn run(&self, state: AgentState) -> Result<AgentState, PipelineError> {
        if self.stage_for(state.current_step()).is_none() {
            tracing::debug!(step = %state.current_step(), "nothing to run");
            return Ok(state);
        }

        let run_id = state.processing_metadata().run_id;
        let mut state = state.mark_started(Utc::now());

        while let Some(stage) = self.stage_for(state.current_step()) {
            let from = state.current_step();
            let started = Instant::now();
            tracing::info!(%run_id, stage = stage.name(), "stage started");

            let next = match stage.run(state).await {
                Ok(next) => next,
                Err(err) => {
                    tracing::error!(%run_id, stage = stage.name(), kind = err.kind(), error = %err, "stage violated its contract");
                    return Err(err);
                }
            };
            validate_transition(from, next.current_step())?;

            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if next.current_step() == Step::Error {
                tracing::warn!(
                    %run_id,
                    stage = stage.name(),
                    elapsed_ms,
                    cause = next.error_context().and_then(ErrorContext::cause).unwrap_or("unknown"),
                    "stage failed"
                );
            } else {
                tracing::info!(%run_id, stage = stage.name(), elapsed_ms, next = %next.current_step(), "stage finished");
            }
            state = next;
        }

        Ok(state.mark_finished(Utc::now()))
    }

    /// Re-enter the step recorded in a failed state's error context and run
    ///
    /// The re-entered step is recorded under [`RETRIED_STEP`] in the
    /// processing metadata.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidInput`] if `state` is not a failed
    /// state naming a working step, otherwise as [`Orchestrator::run`]
    pub async fn retry(&self, state: AgentState) -> Result<AgentState, PipelineError> {
        let step = state.retry_step().ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "state in `{}` has no recoverable failure",
                state.current_step()
            ))
        })?;
        tracing::info!(%step, "retrying failed step");
        let state = state
            .advance(step)?
            .with_metadata_entry(RETRIED_STEP, step.as_str());
        self.run(state).await
    }

    /// Create a state for `query` over `documents` and drive it to the end
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidInput`] for a blank query or an empty
    /// document list, otherwise as [`Orchestrator::run`]. Collaborator
    /// failures are reported through [`SubmitOutcome::error`].
    pub async fn submit(
        &self,
        query: &str,
        documents: Vec<Document>,
    ) -> Result<SubmitOutcome, PipelineError> {
        let state = AgentState::create(query, documents)?;
        let state = self.run(state).await?;
        Ok(SubmitOutcome::from_state(&state))
    }
}
