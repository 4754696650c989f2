//! # reviseloops-core
//!
//! The revision loop: evaluate the current output, ask for feedback, ask
//! for a revision, repeat until the target score is reached, a revision
//! changes nothing, the iteration budget runs out, or a step fails.

mod context;
mod error;
mod generators;
mod loop_runner;
mod outcome;
pub mod prompts;
mod response;

pub use context::{IterationLogEntry, LoopSettings, RevisionInput, RevisionState};
pub use error::LoopError;
pub use generators::{FeedbackGenerator, GenerationContext, RevisionGenerator};
pub use loop_runner::LoopRunner;
pub use outcome::{RevisionResult, StopReason};
pub use response::RevisionResponse;
