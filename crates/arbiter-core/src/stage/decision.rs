//! Decision stage
//!
//! Scores each analysed option as `confidence * similarity_score`, ranks them
//! and asks the generator for a narrative recommendation. The narrative
//! becomes the reasoning of rank 1; other ranks get a fixed-format line.
//! When generation fails the ranking is still committed and the state moves
//! to `error`.

use super::{advance_past, ensure_step, Stage, GENERATION_ERROR, NO_ANALYSES};
use crate::config::DecisionConfig;
use crate::error::PipelineError;
use crate::generation::{GenerationError, Generator};
use crate::prompt::decision_prompt;
use arbiter_kernel::{AgentState, ErrorContext, Step};
use arbiter_model::{Analysis, DecisionOption, Recommendation};
use async_trait::async_trait;
use std::sync::Arc;

/// Ranks analysed options into recommendations
pub struct DecisionStage {
    generator: Arc<dyn Generator>,
    min_score: f64,
    max_recommendations: usize,
}

struct Ranked<'a> {
    option: &'a DecisionOption,
    analysis: &'a Analysis,
    score: f64,
}

/// Score of one option; degraded analyses score zero
#[must_use]
pub fn option_score(option: &DecisionOption, analysis: &Analysis) -> f64 {
    if analysis.is_degraded() {
        0.0
    } else {
        analysis.confidence() * option.similarity_score()
    }
}

fn fixed_reasoning(rank: usize, total: usize, entry: &Ranked<'_>) -> String {
    if entry.analysis.is_degraded() {
        format!(
            "Ranked {rank} of {total}: {} could not be analyzed. {}",
            entry.option.title(),
            entry.analysis.summary()
        )
    } else {
        format!(
            "Ranked {rank} of {total}: {} scored {:.2} (confidence {:.1}/10, similarity {:.2}). {}",
            entry.option.title(),
            entry.score,
            entry.analysis.confidence(),
            entry.option.similarity_score(),
            entry.analysis.summary()
        )
    }
}

impl DecisionStage {
    /// Create the stage over `generator`
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, config: &DecisionConfig) -> Self {
        Self {
            generator,
            min_score: config.min_score,
            max_recommendations: config.max_recommendations.max(1),
        }
    }

    fn rank<'a>(&self, state: &'a AgentState) -> Result<Vec<Ranked<'a>>, PipelineError> {
        let mut ranked = state
            .analyses()
            .iter()
            .map(|analysis| {
                let option = state
                    .found_options()
                    .iter()
                    .find(|o| o.id() == analysis.option_id())
                    .ok_or_else(|| {
                        PipelineError::Consistency(format!(
                            "analysis refers to unknown option `{}`",
                            analysis.option_id()
                        ))
                    })?;
                Ok(Ranked {
                    option,
                    analysis,
                    score: option_score(option, analysis),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        // stable: ties keep analysis order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.retain(|r| r.score >= self.min_score);
        ranked.truncate(self.max_recommendations);
        Ok(ranked)
    }

    async fn narrative(&self, prompt: &str) -> Result<String, GenerationError> {
        let text = self.generator.generate(prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            Err(GenerationError::EmptyResponse)
        } else {
            Ok(text.to_string())
        }
    }
}

#[async_trait]
impl Stage for DecisionStage {
    fn step(&self) -> Step {
        Step::Decision
    }

    async fn run(&self, state: AgentState) -> Result<AgentState, PipelineError> {
        ensure_step(self.step(), &state)?;

        if state.analyses().is_empty() {
            return Ok(state.with_recommendations(Vec::new())?.fail(ErrorContext::stage_failure(
                self.step(),
                NO_ANALYSES,
                "no analyses to rank",
            )));
        }

        let ranked = self.rank(&state)?;
        if ranked.is_empty() {
            return Ok(state.with_recommendations(Vec::new())?.fail(ErrorContext::stage_failure(
                self.step(),
                NO_ANALYSES,
                format!("no option reached the minimum score {:.2}", self.min_score),
            )));
        }

        let prompt_rows: Vec<_> = ranked.iter().map(|r| (r.option, r.analysis, r.score)).collect();
        let prompt = decision_prompt(state.user_query(), &prompt_rows);
        tracing::debug!(ranked = ranked.len(), prompt_bytes = prompt.len(), "requesting recommendation");
        let narrative = self.narrative(&prompt).await;

        let total = ranked.len();
        let recommendations = ranked
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let reasoning = match (&narrative, i) {
                    (Ok(text), 0) => text.clone(),
                    _ => fixed_reasoning(i + 1, total, entry),
                };
                Recommendation::new(
                    entry.option.clone(),
                    entry.analysis.clone(),
                    entry.score,
                    reasoning,
                    u32::try_from(i + 1).unwrap_or(u32::MAX),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(top) = recommendations.first() {
            tracing::info!(
                recommendations = recommendations.len(),
                top = top.option().id(),
                top_score = top.score(),
                "options ranked"
            );
        }

        let next = state.clone().with_recommendations(recommendations)?;
        match narrative {
            Ok(_) => advance_past(self.step(), &next),
            Err(err) => {
                tracing::warn!(error = %err, "recommendation generation failed");
                Ok(next.fail(
                    ErrorContext::stage_failure(self.step(), GENERATION_ERROR, &err)
                        .with_entry("retryable", err.is_retryable()),
                ))
            }
        }
    }
}
