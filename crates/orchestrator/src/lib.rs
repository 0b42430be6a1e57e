//! Orchestrator crate for the article recommendation client.
//!
//! This crate contains the pieces that turn a (user, article) pair into
//! per-source recommendation state:
//! - `dispatcher`: one fetch for one source, normalized into an outcome
//! - `state`: the observable store of loading flags and outcomes
//! - `orchestrator`: validation and fan-out of a submission

pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, FETCH_ERROR_MESSAGE, NOT_FOUND_MESSAGE, SubmitError};
pub use orchestrator::{RecommendationOrchestrator, Submission};
pub use state::{LoadingGuard, Recommendation, RecommendationItem, RecommendationStore, Snapshot};
