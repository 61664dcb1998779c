//! Pros/cons stage
//!
//! One generation call per option. A failed call yields a degraded analysis
//! for that option only; the stage itself still advances.

use super::{advance_past, ensure_step, Stage};
use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::generation::Generator;
use crate::prompt::{analysis_prompt, parse_analysis};
use arbiter_kernel::{AgentState, Step};
use arbiter_model::{Analysis, DecisionOption, EntityError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Analyses every found option
pub struct ProsConsStage {
    generator: Arc<dyn Generator>,
    concurrency: usize,
    default_confidence: f64,
}

impl ProsConsStage {
    /// Create the stage over `generator`
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, config: &AnalysisConfig) -> Self {
        Self {
            generator,
            concurrency: config.concurrency.max(1),
            default_confidence: config.default_confidence,
        }
    }

    async fn analyze(
        &self,
        query: &str,
        position: usize,
        option: &DecisionOption,
    ) -> Result<Analysis, EntityError> {
        let prompt = analysis_prompt(query, position, option);
        tracing::debug!(option_id = option.id(), prompt_bytes = prompt.len(), "analyzing option");

        let response = match self.generator.generate(&prompt).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(option_id = option.id(), error = %err, "option analysis failed");
                return Analysis::degraded(option.id(), &err.to_string());
            }
        };

        match parse_analysis(option.id(), &response, self.default_confidence) {
            Ok(analysis) => Ok(analysis),
            Err(err) => {
                tracing::warn!(option_id = option.id(), error = %err, "unusable analysis response");
                Analysis::degraded(option.id(), &err.to_string())
            }
        }
    }
}

#[async_trait]
impl Stage for ProsConsStage {
    fn step(&self) -> Step {
        Step::ProsCons
    }

    async fn run(&self, state: AgentState) -> Result<AgentState, PipelineError> {
        ensure_step(self.step(), &state)?;

        let query = state.user_query();
        let pending: Vec<_> = state
            .found_options()
            .iter()
            .enumerate()
            .map(|(i, option)| self.analyze(query, i + 1, option))
            .collect();
        let analyses: Vec<Analysis> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        let failed = analyses.iter().filter(|a| a.is_degraded()).count();
        tracing::info!(
            analyses = analyses.len(),
            failed,
            concurrency = self.concurrency,
            "pros/cons analysis finished"
        );

        advance_past(self.step(), &state.with_analyses(analyses)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationError, MockGenerator};
    use crate::stage::test_support;
    use arbiter_kernel::counter;
    use arbiter_model::Metadata;
    use pretty_assertions::assert_eq;

    fn at_pros_cons(ids: &[&str]) -> AgentState {
        let options = ids
            .iter()
            .map(|id| DecisionOption::new(*id, format!("Title {id}"), "", Metadata::new(), 0.5).unwrap())
            .collect();
        test_support::state()
            .with_found_options(options)
            .advance(Step::ProsCons)
            .unwrap()
    }

    fn stage(mock: MockGenerator, concurrency: usize) -> ProsConsStage {
        let config = AnalysisConfig {
            concurrency,
            default_confidence: 5.0,
        };
        ProsConsStage::new(Arc::new(mock), &config)
    }

    #[tokio::test]
    async fn analyses_follow_option_order() {
        let mut mock = MockGenerator::new();
        mock.expect_generate().times(3).returning(|prompt| {
            let title = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Option "))
                .unwrap_or_default()
                .to_string();
            Ok(format!("PROS:\n- good\nSUMMARY: {title}\nCONFIDENCE: 7"))
        });

        let next = stage(mock, 3).run(at_pros_cons(&["a", "b", "c"])).await.unwrap();

        assert_eq!(next.current_step(), Step::Decision);
        let ids: Vec<_> = next.analyses().iter().map(Analysis::option_id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(next.analyses()[1].summary(), "2: Title b");
        assert_eq!(next.processing_metadata().counter(counter::ANALYSES_COMPLETED), 3);
    }

    #[tokio::test]
    async fn one_failure_degrades_only_that_option() {
        let mut mock = MockGenerator::new();
        mock.expect_generate().times(2).returning(|prompt| {
            if prompt.contains("Title b") {
                Err(GenerationError::Backend("LLM API failed".into()))
            } else {
                Ok("SUMMARY: fine\nCONFIDENCE: 6".into())
            }
        });

        let next = stage(mock, 1).run(at_pros_cons(&["a", "b"])).await.unwrap();

        assert_eq!(next.current_step(), Step::Decision);
        assert!(next.error_context().is_none());
        let degraded = &next.analyses()[1];
        assert!(degraded.is_degraded());
        assert_eq!(degraded.option_id(), "b");
        assert!(degraded.summary().starts_with("Error analyzing option:"));
        assert!(degraded.confidence().abs() < f64::EPSILON);
        assert!(!next.analyses()[0].is_degraded());
        assert_eq!(next.processing_metadata().counter(counter::ANALYSES_FAILED), 1);
    }

    #[tokio::test]
    async fn blank_response_degrades() {
        let mut mock = MockGenerator::new();
        mock.expect_generate().returning(|_| Ok("   ".into()));

        let next = stage(mock, 1).run(at_pros_cons(&["a"])).await.unwrap();
        assert!(next.analyses()[0].is_degraded());
    }

    #[tokio::test]
    async fn no_options_advances_with_no_analyses() {
        let mock = MockGenerator::new();
        let next = stage(mock, 2).run(at_pros_cons(&[])).await.unwrap();
        assert_eq!(next.current_step(), Step::Decision);
        assert!(next.analyses().is_empty());
    }

    #[tokio::test]
    async fn rejects_other_steps() {
        let err = stage(MockGenerator::new(), 1)
            .run(test_support::state())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "stage_mismatch");
    }
}
