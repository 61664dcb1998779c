//! Arbiter Core
//!
//! Runs the decision pipeline over an [`arbiter_kernel::AgentState`]:
//! - [`stage`]: option finding, pros/cons analysis and ranking
//! - [`orchestrator`]: drives a state through the stages
//! - [`retrieval`] and [`generation`]: collaborator contracts with reference
//!   implementations
//! - [`config`]: the injected [`PipelineConfig`]
//!
//! # Example
//!
//! ```rust,no_run
//! use arbiter_core::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo(documents: Vec<Document>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let retriever = Arc::new(KeywordIndex::from_documents(&documents));
//! let generator = Arc::new(CommandGenerator::new("llm", Duration::from_secs(60))?);
//! let orchestrator = Orchestrator::new(config, retriever, generator)?;
//!
//! let outcome = orchestrator.submit("Find best investment option", documents).await?;
//! for rec in &outcome.recommendations {
//!     println!("{}. {} ({:.2})", rec.rank(), rec.option().title(), rec.score());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod prompt;
pub mod retrieval;
pub mod stage;

pub use config::{load_config, parse_config, PipelineConfig};
pub use error::PipelineError;
pub use generation::{CommandGenerator, GenerationError, Generator, RetryingGenerator};
pub use orchestrator::{Orchestrator, SubmitOutcome, RETRIED_STEP};
pub use retrieval::{KeywordIndex, RetrievalError, RetrievedCandidate, Retriever};
pub use stage::Stage;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::error::PipelineError;
    pub use crate::generation::{CommandGenerator, GenerationError, Generator, RetryingGenerator};
    pub use crate::orchestrator::{Orchestrator, SubmitOutcome};
    pub use crate::retrieval::{KeywordIndex, RetrievalError, RetrievedCandidate, Retriever};
    pub use crate::stage::Stage;
    pub use arbiter_kernel::{AgentState, ErrorContext, Step};
    pub use arbiter_model::{Analysis, DecisionOption, Document, Metadata, Recommendation};
}
