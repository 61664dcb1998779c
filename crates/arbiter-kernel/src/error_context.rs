//! Structured failure diagnostics
//!
//! An [`ErrorContext`] is an open JSON object. Stages fill the standard keys
//! through [`ErrorContext::stage_failure`]; callers may attach any other
//! structured payload.

use crate::error::StateError;
use crate::step::Step;
use arbiter_model::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// Diagnostic record attached to a state when a stage fails
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorContext(Metadata);

impl ErrorContext {
    /// Key holding the failing step name
    pub const STEP: &'static str = "step";
    /// Key holding the human-readable cause
    pub const ERROR: &'static str = "error";
    /// Key holding the failure category
    pub const ERROR_TYPE: &'static str = "error_type";
    /// Key holding the RFC 3339 failure time
    pub const TIMESTAMP: &'static str = "timestamp";

    /// Wrap an arbitrary structured payload
    #[inline]
    #[must_use]
    pub fn new(payload: Metadata) -> Self {
        Self(payload)
    }

    /// Standard record for a failed stage, stamped with the current time
    #[must_use]
    pub fn stage_failure(step: Step, error_type: &str, cause: impl Display) -> Self {
        Self::default()
            .with_entry(Self::STEP, step.as_str())
            .with_entry(Self::ERROR, cause.to_string())
            .with_entry(Self::ERROR_TYPE, error_type)
            .with_entry(Self::TIMESTAMP, Utc::now().to_rfc3339())
    }

    /// Add or replace an entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Failing step, if recorded and recognised
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        self.get_str(Self::STEP).and_then(|s| s.parse().ok())
    }

    /// Failure cause
    #[inline]
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.get_str(Self::ERROR)
    }

    /// Failure category (`"retrieval_error"`, `"generation_error"`, ...)
    #[inline]
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        self.get_str(Self::ERROR_TYPE)
    }

    /// Failure time
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.get_str(Self::TIMESTAMP)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Raw entry lookup
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Metadata> for ErrorContext {
    fn from(payload: Metadata) -> Self {
        Self(payload)
    }
}

impl TryFrom<Value> for ErrorContext {
    type Error = StateError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StateError::InvalidInput(format!(
                "error info must be a structured record, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_failure_fills_standard_keys() {
        let ctx = ErrorContext::stage_failure(Step::ProsCons, "generation_error", "LLM API failed");
        assert_eq!(ctx.step(), Some(Step::ProsCons));
        assert_eq!(ctx.cause(), Some("LLM API failed"));
        assert_eq!(ctx.error_type(), Some("generation_error"));
        assert!(ctx.timestamp().is_some());
    }

    #[test]
    fn arbitrary_payload_accepted() {
        let ctx = ErrorContext::try_from(json!({ "error": "boom", "attempts": 3 })).unwrap();
        assert_eq!(ctx.cause(), Some("boom"));
        assert_eq!(ctx.get("attempts"), Some(&json!(3)));
        assert_eq!(ctx.step(), None);
        assert_eq!(ctx.timestamp(), None);
    }

    #[test]
    fn non_object_payload_rejected() {
        for value in [json!("boom"), json!(42), json!(["a"]), Value::Null] {
            let err = ErrorContext::try_from(value).unwrap_err();
            assert!(err.is_invalid_input());
        }
    }

    #[test]
    fn unknown_step_name_is_not_a_step() {
        let ctx = ErrorContext::default().with_entry(ErrorContext::STEP, "ingest");
        assert_eq!(ctx.step(), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let ctx = ErrorContext::default().with_entry("error", "x");
        assert_eq!(serde_json::to_value(&ctx).unwrap(), json!({ "error": "x" }));
    }
}
