//! Pros/cons analysis of a single option

use crate::error::EntityError;
use crate::is_non_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "analysis";

/// Lowest accepted confidence
pub const CONFIDENCE_MIN: f64 = 0.0;
/// Highest accepted confidence
pub const CONFIDENCE_MAX: f64 = 10.0;

/// Structured output of the pros/cons stage for one option
///
/// # Invariants
/// - `option_id` and `summary` are non-blank
/// - every pro and con is a non-blank statement
/// - `confidence` is in `[0.0, 10.0]`
///
/// A *degraded* analysis records a generation failure for its option: it has
/// no pros or cons, zero confidence, and the failure message as its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnalysisRecord")]
pub struct Analysis {
    option_id: String,
    pros: Vec<String>,
    cons: Vec<String>,
    summary: String,
    confidence: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AnalysisRecord {
    option_id: String,
    #[serde(default)]
    pros: Vec<String>,
    #[serde(default)]
    cons: Vec<String>,
    summary: String,
    confidence: f64,
    #[serde(default)]
    degraded: bool,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRecord> for Analysis {
    type Error = EntityError;

    fn try_from(r: AnalysisRecord) -> Result<Self, Self::Error> {
        let mut analysis = Self::new(r.option_id, r.pros, r.cons, r.summary, r.confidence)?;
        if r.degraded
            && (!analysis.pros.is_empty()
                || !analysis.cons.is_empty()
                || analysis.confidence > CONFIDENCE_MIN)
        {
            return Err(EntityError::invalid(
                ENTITY,
                "degraded analysis must have no pros, cons or confidence",
            ));
        }
        analysis.degraded = r.degraded;
        analysis.created_at = r.created_at;
        Ok(analysis)
    }
}

impl Analysis {
    /// Create a validated analysis stamped with the current time
    ///
    /// # Errors
    /// Returns [`EntityError::InvalidEntity`] naming the first violated rule
    pub fn new(
        option_id: impl Into<String>,
        pros: Vec<String>,
        cons: Vec<String>,
        summary: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, EntityError> {
        let option_id = option_id.into();
        let summary = summary.into();

        if !is_non_blank(&option_id) {
            return Err(EntityError::invalid(ENTITY, "option id must be a non-empty string"));
        }
        if !pros.iter().all(|p| is_non_blank(p)) {
            return Err(EntityError::invalid(ENTITY, "pros must be non-empty strings"));
        }
        if !cons.iter().all(|c| is_non_blank(c)) {
            return Err(EntityError::invalid(ENTITY, "cons must be non-empty strings"));
        }
        if !is_non_blank(&summary) {
            return Err(EntityError::invalid(ENTITY, "summary must be a non-empty string"));
        }
        if !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&confidence) {
            return Err(EntityError::invalid(ENTITY, "confidence out of range"));
        }

        Ok(Self {
            option_id,
            pros,
            cons,
            summary,
            confidence,
            degraded: false,
            created_at: Utc::now(),
        })
    }

    /// Record a failed analysis for `option_id`
    ///
    /// # Errors
    /// Returns [`EntityError::InvalidEntity`] if `option_id` is blank
    pub fn degraded(option_id: impl Into<String>, cause: &str) -> Result<Self, EntityError> {
        let cause = if is_non_blank(cause) { cause } else { "unknown failure" };
        let mut analysis = Self::new(
            option_id,
            Vec::new(),
            Vec::new(),
            format!("Error analyzing option: {cause}"),
            CONFIDENCE_MIN,
        )?;
        analysis.degraded = true;
        Ok(analysis)
    }

    /// Identifier of the analysed option
    #[inline]
    #[must_use]
    pub fn option_id(&self) -> &str {
        &self.option_id
    }

    /// Pro statements in the order produced
    #[inline]
    #[must_use]
    pub fn pros(&self) -> &[String] {
        &self.pros
    }

    /// Con statements in the order produced
    #[inline]
    #[must_use]
    pub fn cons(&self) -> &[String] {
        &self.cons
    }

    /// Free-text summary (the failure message for degraded analyses)
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Confidence in `[0.0, 10.0]`
    #[inline]
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether this analysis records a generation failure
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Creation timestamp
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
