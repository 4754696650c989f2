//! # reviseloops-eval
//!
//! Rubric scoring for the reviseloops revision system.
//!
//! Each [`Aspect`] is judged by its own [`AspectEvaluator`]; a
//! [`MultiEvaluator`] fans the judgments out concurrently and folds them
//! into one [`AggregatedEvaluation`].

mod aspect;
pub mod evaluator;
mod multi;
pub mod prompts;

pub use aspect::Aspect;
pub use evaluator::{
    parse_judgment, AspectEvaluator, EvaluationError, EvaluationInput, EvaluationResult, Judgment,
    ScoreRange,
};
pub use multi::{AggregatedEvaluation, MultiEvaluator};
