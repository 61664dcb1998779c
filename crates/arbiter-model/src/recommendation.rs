//! Ranked recommendations

use crate::analysis::Analysis;
use crate::error::EntityError;
use crate::is_non_blank;
use crate::option::DecisionOption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "recommendation";

/// Output of the decision stage
///
/// Owns its option and analysis by value.
///
/// # Invariants
/// - `option.id() == analysis.option_id()`, checked before any other rule
/// - `score` is finite and non-negative
/// - `reasoning` is non-blank
/// - `rank >= 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecommendationRecord")]
pub struct Recommendation {
    option: DecisionOption,
    analysis: Analysis,
    score: f64,
    reasoning: String,
    rank: u32,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RecommendationRecord {
    option: DecisionOption,
    analysis: Analysis,
    score: f64,
    reasoning: String,
    rank: u32,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl TryFrom<RecommendationRecord> for Recommendation {
    type Error = EntityError;

    fn try_from(r: RecommendationRecord) -> Result<Self, Self::Error> {
        let mut rec = Self::new(r.option, r.analysis, r.score, r.reasoning, r.rank)?;
        rec.created_at = r.created_at;
        Ok(rec)
    }
}

impl Recommendation {
    /// Create a validated recommendation
    ///
    /// # Errors
    /// - [`EntityError::Consistency`] if the option and analysis disagree on
    ///   the identifier, regardless of the other fields
    /// - [`EntityError::InvalidEntity`] for score, reasoning or rank violations
    pub fn new(
        option: DecisionOption,
        analysis: Analysis,
        score: f64,
        reasoning: impl Into<String>,
        rank: u32,
    ) -> Result<Self, EntityError> {
        if option.id() != analysis.option_id() {
            return Err(EntityError::Consistency {
                option_id: option.id().to_string(),
                analysis_option_id: analysis.option_id().to_string(),
            });
        }

        let reasoning = reasoning.into();
        if !(score.is_finite() && score >= 0.0) {
            return Err(EntityError::invalid(ENTITY, "score must be non-negative"));
        }
        if !is_non_blank(&reasoning) {
            return Err(EntityError::invalid(ENTITY, "reasoning must be a non-empty string"));
        }
        if rank < 1 {
            return Err(EntityError::invalid(ENTITY, "rank must be a positive integer"));
        }

        Ok(Self {
            option,
            analysis,
            score,
            reasoning,
            rank,
            created_at: Utc::now(),
        })
    }

    /// The recommended option
    #[inline]
    #[must_use]
    pub fn option(&self) -> &DecisionOption {
        &self.option
    }

    /// Analysis backing the recommendation
    #[inline]
    #[must_use]
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Ranking score
    #[inline]
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Explanation shown to the user
    #[inline]
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// 1-based position in the ranking
    #[inline]
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Creation timestamp
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
