use chrono::{DateTime, Utc};
use reviseloops_eval::AggregatedEvaluation;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::prompts::NO_INITIAL_OUTPUT;

/// What the loop is asked to improve. Immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInput {
    /// Instructions the output was originally produced under
    pub system_prompt: String,
    pub user_input: String,
    #[serde(default)]
    pub initial_output: Option<String>,
}

impl RevisionInput {
    pub fn new(system_prompt: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_input: user_input.into(),
            initial_output: None,
        }
    }

    pub fn with_initial_output(mut self, output: impl Into<String>) -> Self {
        self.initial_output = Some(output.into());
        self
    }

    /// The text the first iteration starts from
    pub fn starting_output(&self) -> &str {
        self.initial_output.as_deref().unwrap_or(NO_INITIAL_OUTPUT)
    }
}

/// Loop bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub max_iterations: usize,
    /// Stop once the overall score reaches this; ignored without an evaluator
    pub target_score: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            target_score: 90.0,
        }
    }
}

/// Audit record of one iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationLogEntry {
    /// 1-based
    pub iteration: usize,
    pub evaluation: Option<AggregatedEvaluation>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
    pub revised_output: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IterationLogEntry {
    pub fn new(iteration: usize) -> Self {
        Self {
            iteration,
            evaluation: None,
            feedback: None,
            suggestions: Vec::new(),
            revised_output: None,
            timestamp: Utc::now(),
        }
    }
}

/// Mutable state of a run, owned by the sequential loop driver
#[derive(Debug)]
pub struct RevisionState {
    pub iteration: usize,
    pub current_output: String,
    pub previous_output: Option<String>,
    pub revision_history: Vec<String>,
    pub evaluation_history: Vec<AggregatedEvaluation>,
    pub history_log: Vec<IterationLogEntry>,
    pub final_suggestions: Vec<String>,
    pub error: Option<String>,
    started_at: Instant,
}

impl RevisionState {
    pub fn new(input: &RevisionInput) -> Self {
        let current_output = input.starting_output().to_string();
        Self {
            iteration: 0,
            revision_history: vec![current_output.clone()],
            current_output,
            previous_output: None,
            evaluation_history: Vec::new(),
            history_log: Vec::new(),
            final_suggestions: Vec::new(),
            error: None,
            started_at: Instant::now(),
        }
    }

    /// Make `revised` the current output and keep the old one as previous
    pub fn accept(&mut self, revised: String) {
        self.revision_history.push(revised.clone());
        let old = std::mem::replace(&mut self.current_output, revised);
        self.previous_output = Some(old);
    }

    /// Record a finished (or aborted) iteration
    pub fn record(&mut self, entry: IterationLogEntry) {
        if let Some(ref evaluation) = entry.evaluation {
            self.evaluation_history.push(evaluation.clone());
        }
        self.final_suggestions = entry.suggestions.clone();
        self.history_log.push(entry);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}
