//! Entity validation errors

/// Construction-time validation failure
///
/// Each variant names the specific rule that was violated so callers can
/// tell "score out of range" apart from "id mismatch" without string matching.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// A single-entity invariant was violated
    #[error("invalid {entity}: {rule}")]
    InvalidEntity {
        /// Entity type name (`"document"`, `"option"`, ...)
        entity: &'static str,
        /// The rule that failed
        rule: &'static str,
    },

    /// A recommendation paired an option with another option's analysis
    #[error("option/analysis id mismatch: option `{option_id}`, analysis refers to `{analysis_option_id}`")]
    Consistency {
        /// Identifier of the owned option
        option_id: String,
        /// `option_id` carried by the owned analysis
        analysis_option_id: String,
    },
}

impl EntityError {
    #[inline]
    pub(crate) fn invalid(entity: &'static str, rule: &'static str) -> Self {
        Self::InvalidEntity { entity, rule }
    }

    /// The violated rule, if this is a single-entity violation
    #[inline]
    #[must_use]
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::InvalidEntity { rule, .. } => Some(rule),
            Self::Consistency { .. } => None,
        }
    }

    /// Check if this is an option/analysis consistency breach
    #[inline]
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn invalid_entity_display_names_rule() {
        let err = EntityError::invalid("option", "similarity score out of range");
        assert_eq!(
            err.to_string(),
            "invalid option: similarity score out of range"
        );
        assert_eq!(err.rule(), Some("similarity score out of range"));
        assert!(!err.is_consistency());
    }

    #[test]
    fn consistency_display_names_both_ids() {
        let err = EntityError::Consistency {
            option_id: "a".into(),
            analysis_option_id: "b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`a`"));
        assert!(msg.contains("`b`"));
        assert!(err.is_consistency());
        assert_eq!(err.rule(), None);
    }
}
