//! Option-finding stage

use super::{advance_past, ensure_step, Stage, NO_OPTIONS, RETRIEVAL_ERROR};
use crate::config::RetrievalConfig;
use crate::error::PipelineError;
use crate::retrieval::{RetrievedCandidate, Retriever};
use arbiter_kernel::{counter, AgentState, ErrorContext, Step};
use arbiter_model::DecisionOption;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

const TITLE_MAX_CHARS: usize = 80;

/// Retrieves candidate options for the query
pub struct OptionFinderStage {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    min_similarity: f64,
}

impl OptionFinderStage {
    /// Create the stage over `retriever`
    #[must_use]
    pub fn new(retriever: Arc<dyn Retriever>, config: &RetrievalConfig) -> Self {
        Self {
            retriever,
            top_k: config.top_k,
            min_similarity: config.min_similarity,
        }
    }

    /// Convert candidates into options, returning the rejected count
    fn to_options(&self, candidates: Vec<RetrievedCandidate>) -> (Vec<DecisionOption>, u64) {
        let mut options = Vec::new();
        let mut seen = HashSet::new();
        let mut rejected = 0u64;

        for (i, candidate) in candidates.into_iter().enumerate() {
            if options.len() == self.top_k {
                rejected += 1;
                continue;
            }
            if candidate.score < self.min_similarity {
                rejected += 1;
                continue;
            }

            let base_id = candidate_id(&candidate).unwrap_or_else(|| format!("option-{}", i + 1));
            let mut id = base_id.clone();
            let mut suffix = 2;
            while seen.contains(&id) {
                id = format!("{base_id}-{suffix}");
                suffix += 1;
            }

            let title = candidate_title(&candidate);
            match DecisionOption::new(
                id.clone(),
                title,
                candidate.content,
                candidate.metadata,
                candidate.score,
            ) {
                Ok(option) => {
                    seen.insert(id);
                    options.push(option);
                }
                Err(err) => {
                    tracing::debug!(candidate = i, error = %err, "rejected retrieval candidate");
                    rejected += 1;
                }
            }
        }

        (options, rejected)
    }
}

fn candidate_id(candidate: &RetrievedCandidate) -> Option<String> {
    match candidate.metadata.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn candidate_title(candidate: &RetrievedCandidate) -> String {
    let from_metadata = ["title", "name"].iter().find_map(|key| {
        candidate
            .metadata
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    });
    match from_metadata {
        Some(title) => title.to_string(),
        None => candidate
            .content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .chars()
            .take(TITLE_MAX_CHARS)
            .collect(),
    }
}

#[async_trait]
impl Stage for OptionFinderStage {
    fn step(&self) -> Step {
        Step::OptionFinder
    }

    async fn run(&self, state: AgentState) -> Result<AgentState, PipelineError> {
        ensure_step(self.step(), &state)?;

        let candidates = match self.retriever.search(state.user_query(), self.top_k).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), "retrieval failed");
                return Ok(state.fail(
                    ErrorContext::stage_failure(self.step(), RETRIEVAL_ERROR, &err)
                        .with_entry("retryable", err.is_retryable()),
                ));
            }
        };

        let retrieved = candidates.len();
        let (options, rejected) = self.to_options(candidates);
        tracing::info!(retrieved, kept = options.len(), rejected, "options found");

        let state = state.with_counter(counter::CANDIDATES_REJECTED, rejected);
        if options.is_empty() {
            return Ok(state.with_found_options(Vec::new()).fail(ErrorContext::stage_failure(
                self.step(),
                NO_OPTIONS,
                "no candidate options matched the query",
            )));
        }

        advance_past(self.step(), &state.with_found_options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{MockRetriever, RetrievalError};
    use crate::stage::test_support;
    use arbiter_model::Metadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn candidate(content: &str, metadata: Value, score: f64) -> RetrievedCandidate {
        let metadata: Metadata = match metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };
        RetrievedCandidate {
            content: content.into(),
            metadata,
            score,
        }
    }

    fn stage(mock: MockRetriever, config: &RetrievalConfig) -> OptionFinderStage {
        OptionFinderStage::new(Arc::new(mock), config)
    }

    #[tokio::test]
    async fn maps_candidates_to_options() {
        let mut mock = MockRetriever::new();
        mock.expect_search()
            .withf(|query, k| query == "Find best investment option" && *k == 5)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    candidate("Bond fund\nLow risk", json!({ "id": "bond", "title": "Bonds" }), 0.9),
                    candidate("Index fund\nHigh growth", json!({}), 0.4),
                ])
            });

        let next = stage(mock, &RetrievalConfig::default())
            .run(test_support::state())
            .await
            .unwrap();

        assert_eq!(next.current_step(), Step::ProsCons);
        let options = next.found_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].id(), "bond");
        assert_eq!(options[0].title(), "Bonds");
        assert_eq!(options[1].id(), "option-2");
        assert_eq!(options[1].title(), "Index fund");
        assert_eq!(options[1].description(), "Index fund\nHigh growth");
        assert_eq!(next.processing_metadata().counter(counter::OPTIONS_FOUND), 2);
    }

    #[tokio::test]
    async fn filters_and_deduplicates() {
        let mut mock = MockRetriever::new();
        mock.expect_search().returning(|_, _| {
            Ok(vec![
                candidate("A", json!({ "id": "x" }), 0.8),
                candidate("B", json!({ "id": "x" }), 0.7),
                candidate("C", json!({}), 0.1),
                candidate("D", json!({}), 1.7),
                candidate("   ", json!({}), 0.9),
            ])
        });

        let config = RetrievalConfig {
            top_k: 5,
            min_similarity: 0.5,
        };
        let next = stage(mock, &config).run(test_support::state()).await.unwrap();

        let ids: Vec<_> = next.found_options().iter().map(DecisionOption::id).collect();
        assert_eq!(ids, ["x", "x-2"]);
        assert_eq!(next.processing_metadata().counter(counter::CANDIDATES_REJECTED), 3);
    }

    #[tokio::test]
    async fn caps_at_top_k() {
        let mut mock = MockRetriever::new();
        mock.expect_search().returning(|_, _| {
            Ok(vec![
                candidate("A", json!({}), 0.9),
                candidate("B", json!({}), 0.8),
                candidate("C", json!({}), 0.7),
            ])
        });
        let config = RetrievalConfig {
            top_k: 2,
            min_similarity: 0.0,
        };
        let next = stage(mock, &config).run(test_support::state()).await.unwrap();
        assert_eq!(next.found_options().len(), 2);
    }

    #[tokio::test]
    async fn retrieval_failure_lands_in_error() {
        let mut mock = MockRetriever::new();
        mock.expect_search()
            .returning(|_, _| Err(RetrievalError::Unavailable("index offline".into())));

        let input = test_support::state();
        let next = stage(mock, &RetrievalConfig::default()).run(input.clone()).await.unwrap();

        assert_eq!(next.current_step(), Step::Error);
        let ctx = next.error_context().unwrap();
        assert_eq!(ctx.step(), Some(Step::OptionFinder));
        assert_eq!(ctx.error_type(), Some(RETRIEVAL_ERROR));
        assert_eq!(ctx.get("retryable"), Some(&json!(true)));
        assert!(next.found_options().is_empty());
        assert_eq!(input.current_step(), Step::OptionFinder);
    }

    #[tokio::test]
    async fn empty_retrieval_is_a_stage_failure() {
        let mut mock = MockRetriever::new();
        mock.expect_search().returning(|_, _| Ok(Vec::new()));

        let next = stage(mock, &RetrievalConfig::default())
            .run(test_support::state())
            .await
            .unwrap();
        assert_eq!(next.current_step(), Step::Error);
        assert_eq!(next.error_context().unwrap().error_type(), Some(NO_OPTIONS));
        assert_eq!(next.retry_step(), Some(Step::OptionFinder));
    }

    #[tokio::test]
    async fn wrong_step_is_a_contract_violation() {
        let mock = MockRetriever::new();
        let state = test_support::state().advance(Step::ProsCons).unwrap();
        let err = stage(mock, &RetrievalConfig::default()).run(state).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::StageMismatch {
                stage: Step::OptionFinder,
                actual: Step::ProsCons
            }
        );
    }
}
