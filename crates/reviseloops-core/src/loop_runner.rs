use std::sync::Arc;
use tracing::{debug, info, warn};

use reviseloops_eval::{EvaluationInput, MultiEvaluator};
use reviseloops_logging::{LogEvent, Logger, SessionWriter};
use reviseloops_model::Model;

use crate::context::{IterationLogEntry, LoopSettings, RevisionInput, RevisionState};
use crate::error::LoopError;
use crate::generators::{FeedbackGenerator, GenerationContext, RevisionGenerator};
use crate::outcome::{IterationResult, RevisionResult, StopReason};

const FEEDBACK_PREVIEW_CHARS: usize = 200;

/// Drives the evaluate → feedback → revise loop
pub struct LoopRunner<'a> {
    /// Produces revisions
    agent: &'a dyn Model,
    /// Produces feedback
    reviser: &'a dyn Model,
    evaluator: Option<&'a MultiEvaluator>,
    settings: LoopSettings,
    logger: Arc<Logger>,
    session: Option<&'a SessionWriter>,
}

impl<'a> LoopRunner<'a> {
    pub fn new(agent: &'a dyn Model, reviser: &'a dyn Model, logger: Arc<Logger>) -> Self {
        Self {
            agent,
            reviser,
            evaluator: None,
            settings: LoopSettings::default(),
            logger,
            session: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: &'a MultiEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Append each iteration's log entry to a session transcript
    pub fn with_session(mut self, session: &'a SessionWriter) -> Self {
        self.session = Some(session);
        self
    }

    /// Run until a stop condition is met.
    ///
    /// Every stop reason, including a failed iteration, yields `Ok` with the
    /// history accumulated so far. `Err` is returned only for settings that
    /// make the loop impossible to start.
    pub async fn run(&self, input: &RevisionInput) -> Result<RevisionResult, LoopError> {
        if self.settings.max_iterations == 0 {
            return Err(LoopError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.settings.target_score.is_nan() {
            return Err(LoopError::Config("target_score must be a number".to_string()));
        }

        self.logger.log(&LogEvent::LoopStarted {
            user_input: input.user_input.clone(),
            max_iterations: self.settings.max_iterations,
            target_score: self.evaluator.map(|_| self.settings.target_score),
            aspects: self
                .evaluator
                .map(|e| e.aspects().iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
        });

        let mut state = RevisionState::new(input);

        let stop_reason = loop {
            if state.iteration >= self.settings.max_iterations {
                self.logger.log(&LogEvent::MaxIterationsReached {
                    iterations: state.iteration,
                });
                break StopReason::MaxIterationsExhausted;
            }

            state.iteration += 1;
            let iteration = state.iteration;
            info!(iteration, "Starting revision iteration");
            self.logger.log(&LogEvent::IterationStarted { iteration });

            let mut entry = IterationLogEntry::new(iteration);
            let outcome = self.run_iteration(&state, input, &mut entry).await;

            if let Some(session) = self.session {
                session.write_iteration(&entry);
            }

            match outcome {
                Ok(result) => {
                    state.record(entry);
                    if let Some(reason) = result.stop_reason {
                        break reason;
                    }
                    if let Some(revised) = result.revised_output {
                        state.accept(revised);
                    }
                    debug!(iteration, "Revision iteration complete");
                }
                Err(e) => {
                    warn!(iteration, error = %e, "Error during revision iteration");
                    self.logger.log(&LogEvent::ErrorEncountered {
                        iteration,
                        error: e.to_string(),
                    });
                    state.error = Some(e.to_string());
                    state.record(entry);
                    break StopReason::ErrorAborted;
                }
            }
        };

        self.logger.log(&LogEvent::LoopCompleted {
            iterations: state.iteration,
            stop_reason: stop_reason.to_string(),
            duration_secs: state.total_duration().as_secs_f64(),
        });

        Ok(RevisionResult::from_state(state, stop_reason))
    }

    /// Run a single iteration, filling `entry` as each stage completes so a
    /// failure still leaves a record of what happened before it.
    async fn run_iteration(
        &self,
        state: &RevisionState,
        input: &RevisionInput,
        entry: &mut IterationLogEntry,
    ) -> Result<IterationResult, LoopError> {
        let iteration = entry.iteration;

        let evaluation = match self.evaluator {
            Some(evaluator) => {
                let evaluation = evaluator
                    .evaluate(EvaluationInput {
                        system_prompt: &input.system_prompt,
                        user_input: &input.user_input,
                        current_output: &state.current_output,
                        previous_output: state.previous_output.as_deref(),
                    })
                    .await?;

                self.logger.log(&LogEvent::EvaluationCompleted {
                    iteration,
                    overall_score: evaluation.overall_score(),
                    aspect_scores: evaluation.aspect_scores_summary(),
                });
                entry.evaluation = Some(evaluation.clone());

                if evaluation.overall_score() >= self.settings.target_score {
                    info!(
                        iteration,
                        overall_score = evaluation.overall_score(),
                        target_score = self.settings.target_score,
                        "Target score reached"
                    );
                    self.logger.log(&LogEvent::TargetScoreReached {
                        iteration,
                        overall_score: evaluation.overall_score(),
                        target_score: self.settings.target_score,
                    });
                    return Ok(IterationResult {
                        stop_reason: Some(StopReason::TargetScoreReached),
                        revised_output: None,
                    });
                }
                Some(evaluation)
            }
            None => None,
        };

        let context = GenerationContext {
            system_prompt: &input.system_prompt,
            user_input: &input.user_input,
            current_output: &state.current_output,
            previous_output: state.previous_output.as_deref(),
            evaluation: evaluation.as_ref(),
        };

        let feedback = FeedbackGenerator::new(self.reviser)
            .generate(&context)
            .await
            .map_err(LoopError::Feedback)?;
        self.logger.log(&LogEvent::FeedbackGenerated {
            iteration,
            feedback_preview: feedback.chars().take(FEEDBACK_PREVIEW_CHARS).collect(),
        });
        entry.feedback = Some(feedback.clone());

        let revision = RevisionGenerator::new(self.agent)
            .generate(&context, &feedback)
            .await
            .map_err(LoopError::Revision)?;
        let suggestion_count = revision.suggestions.len();
        entry.suggestions = revision.suggestions.clone();
        entry.revised_output = Some(revision.revised_output.clone());

        if !revision.has_output() {
            warn!(iteration, "Revision response had no REVISED OUTPUT block");
        }

        if revision.revised_output == state.current_output {
            info!(iteration, "Revision reproduced the current output");
            self.logger.log(&LogEvent::Converged { iteration });
            return Ok(IterationResult {
                stop_reason: Some(StopReason::Converged),
                revised_output: None,
            });
        }

        self.logger.log(&LogEvent::RevisionAccepted {
            iteration,
            suggestions: suggestion_count,
            output_chars: revision.revised_output.chars().count(),
        });

        Ok(IterationResult {
            stop_reason: None,
            revised_output: Some(revision.revised_output),
        })
    }
}
