//! Workflow steps

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A workflow step
///
/// Serialized as its snake_case name (`"option_finder"`, `"pros_cons"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Retrieve candidate options for the query
    OptionFinder,
    /// Analyse pros and cons of each option
    ProsCons,
    /// Rank options and produce a recommendation
    Decision,
    /// Terminal, absorbing
    Complete,
    /// A stage failed; recoverable into any working step
    Error,
}

impl Step {
    /// Every step, in workflow order
    pub const ALL: [Step; 5] = [
        Step::OptionFinder,
        Step::ProsCons,
        Step::Decision,
        Step::Complete,
        Step::Error,
    ];

    /// The three steps that run a stage
    pub const WORKING: [Step; 3] = [Step::OptionFinder, Step::ProsCons, Step::Decision];

    /// Canonical name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Step::OptionFinder => "option_finder",
            Step::ProsCons => "pros_cons",
            Step::Decision => "decision",
            Step::Complete => "complete",
            Step::Error => "error",
        }
    }

    /// Step that follows on the happy path
    #[inline]
    #[must_use]
    pub const fn successor(self) -> Option<Step> {
        match self {
            Step::OptionFinder => Some(Step::ProsCons),
            Step::ProsCons => Some(Step::Decision),
            Step::Decision => Some(Step::Complete),
            Step::Complete | Step::Error => None,
        }
    }

    /// Whether a stage runs in this step
    #[inline]
    #[must_use]
    pub const fn is_working(self) -> bool {
        matches!(self, Step::OptionFinder | Step::ProsCons | Step::Decision)
    }

    /// Whether no further transition is permitted
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Step::Complete)
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| StateError::UnknownStep(s.to_string()))
    }
}
