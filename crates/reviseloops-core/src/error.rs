use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] reviseloops_eval::EvaluationError),

    #[error("Feedback generation failed: {0}")]
    Feedback(#[source] reviseloops_model::ModelError),

    #[error("Revision generation failed: {0}")]
    Revision(#[source] reviseloops_model::ModelError),

    #[error("Configuration error: {0}")]
    Config(String),
}
