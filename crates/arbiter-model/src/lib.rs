//! Arbiter Model
//!
//! Value types exchanged between the stages of the decision pipeline:
//! - [`Document`]: ingested content with open metadata and an optional embedding
//! - [`DecisionOption`]: a candidate surfaced by retrieval, scored in `[0.0, 1.0]`
//! - [`Analysis`]: pros/cons of one option, confidence in `[0.0, 10.0]`
//! - [`Recommendation`]: a ranked option together with its analysis
//!
//! Every entity has a single validating constructor. A value that exists has
//! passed validation; there is no way to observe a partially valid entity,
//! including through deserialization.
//!
//! # Example
//!
//! ```rust
//! use arbiter_model::{Analysis, DecisionOption, Metadata, Recommendation};
//!
//! let option = DecisionOption::new("bond-fund", "Bond fund", "Low risk", Metadata::new(), 0.82)?;
//! let analysis = Analysis::new(
//!     "bond-fund",
//!     vec!["Stable returns".into()],
//!     vec!["Low upside".into()],
//!     "Safe choice",
//!     7.5,
//! )?;
//! let rec = Recommendation::new(option, analysis, 6.15, "Best risk profile", 1)?;
//! assert_eq!(rec.rank(), 1);
//! # Ok::<(), arbiter_model::EntityError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod analysis;
mod document;
mod error;
mod option;
mod recommendation;

pub use analysis::{Analysis, CONFIDENCE_MAX, CONFIDENCE_MIN};
pub use document::Document;
pub use error::EntityError;
pub use option::DecisionOption;
pub use recommendation::Recommendation;

/// Open key/value mapping with string keys
///
/// Used for document metadata, option data, and error payloads.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns true when `s` has at least one non-whitespace character
#[inline]
pub(crate) fn is_non_blank(s: &str) -> bool {
    !s.trim().is_empty()
}
