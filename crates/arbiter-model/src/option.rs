//! Candidate options surfaced by retrieval

use crate::error::EntityError;
use crate::{is_non_blank, Metadata};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "option";

/// A candidate option found by the retrieval collaborator
///
/// Named `DecisionOption` so it never shadows [`std::option::Option`].
///
/// # Invariants
/// - `id` and `title` are non-blank
/// - `similarity_score` is in `[0.0, 1.0]` (NaN is rejected)
///
/// Identifier uniqueness within one retrieval result set is a property of the
/// producer, not of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OptionRecord")]
pub struct DecisionOption {
    id: String,
    title: String,
    description: String,
    data: Metadata,
    similarity_score: f64,
}

#[derive(Deserialize)]
struct OptionRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data: Metadata,
    similarity_score: f64,
}

impl TryFrom<OptionRecord> for DecisionOption {
    type Error = EntityError;

    fn try_from(r: OptionRecord) -> Result<Self, Self::Error> {
        Self::new(r.id, r.title, r.description, r.data, r.similarity_score)
    }
}

impl DecisionOption {
    /// Create a validated option
    ///
    /// # Errors
    /// Returns [`EntityError::InvalidEntity`] when the id or title is blank or
    /// the similarity score is outside `[0.0, 1.0]`
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        data: Metadata,
        similarity_score: f64,
    ) -> Result<Self, EntityError> {
        let id = id.into();
        let title = title.into();

        if !is_non_blank(&id) {
            return Err(EntityError::invalid(ENTITY, "id must be a non-empty string"));
        }
        if !is_non_blank(&title) {
            return Err(EntityError::invalid(ENTITY, "title must be a non-empty string"));
        }
        if !(0.0..=1.0).contains(&similarity_score) {
            return Err(EntityError::invalid(ENTITY, "similarity score out of range"));
        }

        Ok(Self {
            id,
            title,
            description: description.into(),
            data,
            similarity_score,
        })
    }

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-text description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Associated data carried over from retrieval
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Metadata {
        &self.data
    }

    /// Similarity to the query, in `[0.0, 1.0]`
    #[inline]
    #[must_use]
    pub fn similarity_score(&self) -> f64 {
        self.similarity_score
    }
}
