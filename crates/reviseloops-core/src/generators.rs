use reviseloops_eval::AggregatedEvaluation;
use reviseloops_model::{Bindings, Model, ModelError};
use tracing::debug;

use crate::prompts::{FEEDBACK_PROMPT, NOT_EVALUATED, NO_PREVIOUS_OUTPUT, REVISION_PROMPT};
use crate::RevisionResponse;

/// Texts and evaluation the feedback and revision prompts are built from
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub system_prompt: &'a str,
    pub user_input: &'a str,
    pub current_output: &'a str,
    pub previous_output: Option<&'a str>,
    pub evaluation: Option<&'a AggregatedEvaluation>,
}

impl GenerationContext<'_> {
    pub fn bindings(&self) -> Bindings {
        let (overall, aspects, reasoning) = match self.evaluation {
            Some(evaluation) => (
                format!("{:.2}", evaluation.overall_score()),
                evaluation.aspect_scores_summary(),
                evaluation.combined_reasoning().to_string(),
            ),
            None => (
                NOT_EVALUATED.to_string(),
                NOT_EVALUATED.to_string(),
                NOT_EVALUATED.to_string(),
            ),
        };

        Bindings::new()
            .with("system_prompt", self.system_prompt)
            .with("user_input", self.user_input)
            .with("current_output", self.current_output)
            .with(
                "previous_output",
                self.previous_output.unwrap_or(NO_PREVIOUS_OUTPUT),
            )
            .with("evaluation_overall_score", overall)
            .with("evaluation_aspect_scores", aspects)
            .with("evaluation_combined_reasoning", reasoning)
    }
}

/// Turns the current output and its evaluation into critique text
pub struct FeedbackGenerator<'a> {
    model: &'a dyn Model,
}

impl<'a> FeedbackGenerator<'a> {
    pub fn new(model: &'a dyn Model) -> Self {
        Self { model }
    }

    /// The response is returned as-is
    pub async fn generate(&self, context: &GenerationContext<'_>) -> Result<String, ModelError> {
        debug!(model = self.model.name(), "Requesting feedback");
        self.model.invoke(&FEEDBACK_PROMPT, &context.bindings()).await
    }
}

/// Turns the current output plus critique into a new candidate
pub struct RevisionGenerator<'a> {
    model: &'a dyn Model,
}

impl<'a> RevisionGenerator<'a> {
    pub fn new(model: &'a dyn Model) -> Self {
        Self { model }
    }

    pub async fn generate(
        &self,
        context: &GenerationContext<'_>,
        feedback: &str,
    ) -> Result<RevisionResponse, ModelError> {
        debug!(model = self.model.name(), "Requesting revision");
        let bindings = context.bindings().with("feedback", feedback);
        let response = self.model.invoke(&REVISION_PROMPT, &bindings).await?;
        Ok(RevisionResponse::parse(&response))
    }
}
