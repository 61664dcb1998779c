//! The state container threaded through the pipeline
//!
//! [`AgentState`] is created once from a query and its documents, then
//! changes only through:
//! - [`AgentState::advance`]: a step transition checked against the table
//! - [`AgentState::fail`]: unconditional move into [`Step::Error`]
//! - the `with_*` recorders stages use to commit their outputs
//!
//! Transitions borrow the state and return a new one, so the input is never
//! modified.

use crate::error::StateError;
use crate::error_context::ErrorContext;
use crate::metadata::{counter, ProcessingMetadata};
use crate::state_machine::validate_transition;
use crate::step::Step;
use arbiter_model::{Analysis, DecisionOption, Document, Metadata, Recommendation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregate holding the query, documents, per-stage outputs and workflow position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StateRecord")]
pub struct AgentState {
    user_query: String,
    uploaded_data: Vec<Document>,
    found_options: Vec<DecisionOption>,
    analyses: Vec<Analysis>,
    recommendations: Vec<Recommendation>,
    current_step: Step,
    error_context: Option<ErrorContext>,
    processing_metadata: ProcessingMetadata,
}

#[derive(Deserialize)]
struct StateRecord {
    user_query: String,
    uploaded_data: Vec<Document>,
    #[serde(default)]
    found_options: Vec<DecisionOption>,
    #[serde(default)]
    analyses: Vec<Analysis>,
    #[serde(default)]
    recommendations: Vec<Recommendation>,
    current_step: Step,
    #[serde(default)]
    error_context: Option<ErrorContext>,
    processing_metadata: ProcessingMetadata,
}

impl TryFrom<StateRecord> for AgentState {
    type Error = StateError;

    fn try_from(r: StateRecord) -> Result<Self, Self::Error> {
        let mut state = Self::create(r.user_query, r.uploaded_data)?
            .with_found_options(r.found_options)
            .with_analyses(r.analyses)?
            .with_recommendations(r.recommendations)?;
        if r.processing_metadata.total_documents != state.uploaded_data.len() {
            return Err(StateError::Consistency(format!(
                "processing metadata counts {} documents but {} were uploaded",
                r.processing_metadata.total_documents,
                state.uploaded_data.len()
            )));
        }
        state.current_step = r.current_step;
        state.error_context = r.error_context;
        state.processing_metadata = r.processing_metadata;
        Ok(state)
    }
}

impl AgentState {
    /// Create the initial state for a run
    ///
    /// The state starts at [`Step::OptionFinder`] with no error context and
    /// empty result sequences. Documents are validated by construction.
    ///
    /// # Errors
    /// Returns [`StateError::InvalidInput`] if the query is blank or there are
    /// no documents
    pub fn create(
        user_query: impl Into<String>,
        documents: Vec<Document>,
    ) -> Result<Self, StateError> {
        let user_query = user_query.into();
        if user_query.trim().is_empty() {
            return Err(StateError::InvalidInput(
                "user query must be a non-empty string".into(),
            ));
        }
        if documents.is_empty() {
            return Err(StateError::InvalidInput(
                "uploaded data must be a non-empty list of documents".into(),
            ));
        }

        let processing_metadata = ProcessingMetadata::new(documents.len());
        tracing::debug!(
            run_id = %processing_metadata.run_id,
            documents = documents.len(),
            "created agent state"
        );

        Ok(Self {
            user_query,
            uploaded_data: documents,
            found_options: Vec::new(),
            analyses: Vec::new(),
            recommendations: Vec::new(),
            current_step: Step::OptionFinder,
            error_context: None,
            processing_metadata,
        })
    }

    /// Create the initial state from raw `(content, metadata)` records
    ///
    /// # Errors
    /// Returns [`StateError::InvalidEntity`] for the first record that fails
    /// document validation, otherwise as [`AgentState::create`]
    pub fn create_from_records<I, S>(user_query: impl Into<String>, records: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (S, Metadata)>,
        S: Into<String>,
    {
        let documents = records
            .into_iter()
            .map(|(content, metadata)| Document::new(content, metadata))
            .collect::<Result<Vec<_>, _>>()?;
        Self::create(user_query, documents)
    }

    /// Move to `next`, leaving every other field unchanged
    ///
    /// The error context is kept across a recovery transition.
    ///
    /// # Errors
    /// Returns [`StateError::InvalidTransition`] if the table forbids the move
    pub fn advance(&self, next: Step) -> Result<Self, StateError> {
        validate_transition(self.current_step, next)?;
        tracing::debug!(from = %self.current_step, to = %next, "advance");
        Ok(Self {
            current_step: next,
            ..self.clone()
        })
    }

    /// Record a failure and move to [`Step::Error`]
    ///
    /// Always succeeds; any structured payload is accepted.
    #[must_use]
    pub fn fail(&self, error_info: impl Into<ErrorContext>) -> Self {
        let error_info = error_info.into();
        tracing::debug!(from = %self.current_step, cause = ?error_info.cause(), "fail");
        Self {
            current_step: Step::Error,
            error_context: Some(error_info),
            ..self.clone()
        }
    }

    /// Commit the option-finding output
    ///
    /// Analyses and recommendations from an earlier pass are discarded, since
    /// they may refer to options that are no longer found.
    #[must_use]
    pub fn with_found_options(mut self, options: Vec<DecisionOption>) -> Self {
        self.processing_metadata
            .set_counter(counter::OPTIONS_FOUND, options.len() as u64);
        self.found_options = options;
        self.clear_analyses();
        self.clear_recommendations();
        self
    }

    /// Commit the pros/cons output
    ///
    /// Recommendations from an earlier pass are discarded.
    ///
    /// # Errors
    /// Returns [`StateError::Consistency`] if an analysis refers to an option
    /// that is not in `found_options`
    pub fn with_analyses(mut self, analyses: Vec<Analysis>) -> Result<Self, StateError> {
        let known = self.option_ids();
        if let Some(orphan) = analyses.iter().find(|a| !known.contains(a.option_id())) {
            return Err(StateError::Consistency(format!(
                "analysis refers to unknown option `{}`",
                orphan.option_id()
            )));
        }

        let failed = analyses.iter().filter(|a| a.is_degraded()).count() as u64;
        let total = analyses.len() as u64;
        self.processing_metadata
            .set_counter(counter::ANALYSES_COMPLETED, total - failed);
        self.processing_metadata
            .set_counter(counter::ANALYSES_FAILED, failed);
        self.analyses = analyses;
        self.clear_recommendations();
        Ok(self)
    }

    /// Commit the decision output
    ///
    /// # Errors
    /// Returns [`StateError::Consistency`] if a recommendation refers to an
    /// option that is not in `found_options`
    pub fn with_recommendations(
        mut self,
        recommendations: Vec<Recommendation>,
    ) -> Result<Self, StateError> {
        let known = self.option_ids();
        if let Some(orphan) = recommendations
            .iter()
            .find(|r| !known.contains(r.option().id()))
        {
            return Err(StateError::Consistency(format!(
                "recommendation refers to unknown option `{}`",
                orphan.option().id()
            )));
        }

        self.processing_metadata
            .set_counter(counter::RECOMMENDATIONS_RANKED, recommendations.len() as u64);
        self.recommendations = recommendations;
        Ok(self)
    }

    /// Set a processing counter
    #[must_use]
    pub fn with_counter(mut self, name: &str, value: u64) -> Self {
        self.processing_metadata.set_counter(name, value);
        self
    }

    /// Add an entry to the open metadata bag
    #[must_use]
    pub fn with_metadata_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.processing_metadata.extra.insert(key.into(), value.into());
        self
    }

    /// Stamp the run start time unless already set
    #[must_use]
    pub fn mark_started(mut self, at: DateTime<Utc>) -> Self {
        self.processing_metadata.started_at.get_or_insert(at);
        self
    }

    /// Stamp the run finish time
    #[must_use]
    pub fn mark_finished(mut self, at: DateTime<Utc>) -> Self {
        self.processing_metadata.finished_at = Some(at);
        self
    }

    fn clear_analyses(&mut self) {
        self.analyses.clear();
        let counters = &mut self.processing_metadata.counters;
        counters.remove(counter::ANALYSES_COMPLETED);
        counters.remove(counter::ANALYSES_FAILED);
    }

    fn clear_recommendations(&mut self) {
        self.recommendations.clear();
        self.processing_metadata
            .counters
            .remove(counter::RECOMMENDATIONS_RANKED);
    }

    fn option_ids(&self) -> HashSet<&str> {
        self.found_options.iter().map(DecisionOption::id).collect()
    }

    /// The working step a caller should re-enter after a failure
    ///
    /// `None` unless the state is in [`Step::Error`] and its error context
    /// names a working step.
    #[must_use]
    pub fn retry_step(&self) -> Option<Step> {
        if self.current_step != Step::Error {
            return None;
        }
        self.error_context
            .as_ref()
            .and_then(ErrorContext::step)
            .filter(|step| step.is_working())
    }

    /// The user's decision query
    #[inline]
    #[must_use]
    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// Uploaded documents
    #[inline]
    #[must_use]
    pub fn uploaded_data(&self) -> &[Document] {
        &self.uploaded_data
    }

    /// Options found by retrieval, in retrieval order
    #[inline]
    #[must_use]
    pub fn found_options(&self) -> &[DecisionOption] {
        &self.found_options
    }

    /// Analyses, in `found_options` order
    #[inline]
    #[must_use]
    pub fn analyses(&self) -> &[Analysis] {
        &self.analyses
    }

    /// Ranked recommendations
    #[inline]
    #[must_use]
    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Current workflow step
    #[inline]
    #[must_use]
    pub fn current_step(&self) -> Step {
        self.current_step
    }

    /// Diagnostics of the last failure, kept across recovery
    #[inline]
    #[must_use]
    pub fn error_context(&self) -> Option<&ErrorContext> {
        self.error_context.as_ref()
    }

    /// Counters, timings and version tag
    #[inline]
    #[must_use]
    pub fn processing_metadata(&self) -> &ProcessingMetadata {
        &self.processing_metadata
    }
}
