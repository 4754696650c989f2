use reviseloops_eval::AggregatedEvaluation;
use serde::Serialize;

use crate::context::{IterationLogEntry, RevisionState};

/// Why the loop stopped. All four are valid terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Overall score reached the target
    TargetScoreReached,
    /// A revision reproduced the current output verbatim
    Converged,
    MaxIterationsExhausted,
    /// An iteration failed; history up to the failure is kept
    ErrorAborted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::TargetScoreReached => "target_score_reached",
            StopReason::Converged => "converged",
            StopReason::MaxIterationsExhausted => "max_iterations_exhausted",
            StopReason::ErrorAborted => "error_aborted",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single iteration, consumed by the loop driver. What the
/// iteration produced is recorded on its log entry.
#[derive(Debug, Clone)]
pub(crate) struct IterationResult {
    pub stop_reason: Option<StopReason>,
    /// Candidate to accept when the loop continues
    pub revised_output: Option<String>,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RevisionResult {
    pub final_output: String,
    /// Starts with the pre-revision output, one entry per accepted revision
    pub revision_history: Vec<String>,
    /// One entry per iteration that completed an evaluation
    pub evaluation_history: Vec<AggregatedEvaluation>,
    pub final_suggestions: Vec<String>,
    pub history_log: Vec<IterationLogEntry>,
    pub stop_reason: StopReason,
    /// Iterations started, including a failed one
    pub iterations: usize,
    pub error: Option<String>,
    pub total_duration_secs: f64,
}

impl RevisionResult {
    pub(crate) fn from_state(state: RevisionState, stop_reason: StopReason) -> Self {
        let total_duration_secs = state.total_duration().as_secs_f64();
        Self {
            final_output: state.current_output,
            revision_history: state.revision_history,
            evaluation_history: state.evaluation_history,
            final_suggestions: state.final_suggestions,
            history_log: state.history_log,
            stop_reason,
            iterations: state.iteration,
            error: state.error,
            total_duration_secs,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.stop_reason,
            StopReason::TargetScoreReached | StopReason::Converged
        )
    }

    /// Score of the most recent evaluation, if any
    pub fn final_score(&self) -> Option<f64> {
        self.evaluation_history
            .last()
            .map(AggregatedEvaluation::overall_score)
    }

    pub fn exit_code(&self) -> i32 {
        match self.stop_reason {
            StopReason::TargetScoreReached | StopReason::Converged => 0,
            StopReason::MaxIterationsExhausted => 1,
            StopReason::ErrorAborted => 2,
        }
    }
}
