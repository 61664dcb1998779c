//! Arbiter Kernel
//!
//! The workflow state machine of the decision pipeline:
//! - [`Step`]: closed enumeration of workflow steps
//! - [`state_machine`]: the fixed transition table and its validators
//! - [`AgentState`]: the state container threaded through the stages
//! - [`ErrorContext`]: structured diagnostics attached on failure
//!
//! # Topology
//!
//! ```text
//! option_finder ──▶ pros_cons ──▶ decision ──▶ complete
//!       │               │             │
//!       └───────────────┴──────┬──────┘
//!                              ▼
//!                            error ──▶ option_finder | pros_cons | decision
//! ```
//!
//! # Example
//!
//! ```rust
//! use arbiter_kernel::{AgentState, Step};
//! use arbiter_model::{Document, Metadata};
//!
//! let docs = vec![Document::new("Bond fund, low risk", Metadata::new())?];
//! let state = AgentState::create("Find best investment option", docs)?;
//! let state = state.advance(Step::ProsCons)?;
//! assert_eq!(state.current_step(), Step::ProsCons);
//! assert!(state.advance(Step::Complete).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod error_context;
pub mod metadata;
pub mod state;
pub mod state_machine;
pub mod step;

pub use error::StateError;
pub use error_context::ErrorContext;
pub use metadata::{counter, ProcessingMetadata, WORKFLOW_VERSION};
pub use state::AgentState;
pub use state_machine::{allowed_transitions, validate_state_transition, validate_transition};
pub use step::Step;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
