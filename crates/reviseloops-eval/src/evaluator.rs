use regex::Regex;
use reviseloops_model::{Bindings, Model, ModelError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

use crate::prompts::{self, NO_PREVIOUS_OUTPUT};
use crate::Aspect;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Evaluation of {aspect} failed: {source}")]
    Transport {
        aspect: Aspect,
        #[source]
        source: ModelError,
    },

    #[error("Score {score} is outside the configured range [{min}, {max}]")]
    Validation { score: i64, min: i64, max: i64 },

    #[error("Invalid score range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("Aspect {0} is configured more than once")]
    DuplicateAspect(Aspect),

    #[error("At least one evaluation aspect is required")]
    NoEvaluators,
}

/// Closed interval every aspect score must fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreRange {
    pub min: i64,
    pub max: i64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl ScoreRange {
    pub fn new(min: i64, max: i64) -> Result<Self, EvaluationError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.min > self.max {
            return Err(EvaluationError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn contains(&self, score: i64) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

/// Score and rationale for one aspect. The score is always inside the
/// range it was constructed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    score: i64,
    reasoning: String,
}

impl EvaluationResult {
    pub fn new(
        score: i64,
        reasoning: impl Into<String>,
        range: ScoreRange,
    ) -> Result<Self, EvaluationError> {
        if !range.contains(score) {
            return Err(EvaluationError::Validation {
                score,
                min: range.min,
                max: range.max,
            });
        }
        Ok(Self {
            score,
            reasoning: reasoning.into(),
        })
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}

/// Unvalidated contents of a judge response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    pub score: i64,
    pub reasoning: String,
    /// False when no score marker was found and `score` fell back to 0
    pub score_found: bool,
}

static SCORE_RE: OnceLock<Regex> = OnceLock::new();
static REASONING_RE: OnceLock<Regex> = OnceLock::new();
static SCORE_WORD_RE: OnceLock<Regex> = OnceLock::new();

/// Extract a score and rationale from a judge response.
///
/// The score is the first optionally signed run of digits after a
/// case-insensitive `score` marker (colon optional), or 0 when there is
/// none. Values too large for `i64` saturate, so range validation rejects
/// them. The rationale is
/// everything after a `reasoning` marker; without one it is the text from
/// the first occurrence of "score" onward, or the whole response. Leading
/// and trailing double quotes are stripped.
pub fn parse_judgment(response: &str) -> Judgment {
    let score_re =
        SCORE_RE.get_or_init(|| Regex::new(r"(?i)score:?\s*(-?\d+)").expect("valid score pattern"));
    let reasoning_re = REASONING_RE
        .get_or_init(|| Regex::new(r"(?is)reasoning:?\s*(.*)").expect("valid reasoning pattern"));
    let score_word_re =
        SCORE_WORD_RE.get_or_init(|| Regex::new(r"(?i)score").expect("valid score pattern"));

    let score = score_re
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| parse_saturating(m.as_str()));

    let reasoning = match reasoning_re.captures(response) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => match score_word_re.find(response) {
            Some(m) => response[m.start()..].trim(),
            None => response,
        },
    };

    Judgment {
        score: score.unwrap_or(0),
        reasoning: reasoning.trim_matches('"').to_string(),
        score_found: score.is_some(),
    }
}

fn parse_saturating(digits: &str) -> i64 {
    digits.parse().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Texts an evaluation is run against
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub system_prompt: &'a str,
    pub user_input: &'a str,
    pub current_output: &'a str,
    pub previous_output: Option<&'a str>,
}

/// Judges one aspect of an output through a model
pub struct AspectEvaluator {
    model: Arc<dyn Model>,
    aspect: Aspect,
    range: ScoreRange,
}

impl AspectEvaluator {
    pub fn new(model: Arc<dyn Model>, aspect: Aspect, range: ScoreRange) -> Self {
        Self {
            model,
            aspect,
            range,
        }
    }

    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    pub fn range(&self) -> ScoreRange {
        self.range
    }

    fn bindings(&self, input: &EvaluationInput<'_>) -> Bindings {
        Bindings::new()
            .with("aspect", self.aspect.as_str())
            .with("system_prompt", input.system_prompt)
            .with("user_input", input.user_input)
            .with("current_output", input.current_output)
            .with(
                "previous_output",
                input.previous_output.unwrap_or(NO_PREVIOUS_OUTPUT),
            )
            .with("score_min", self.range.min.to_string())
            .with("score_max", self.range.max.to_string())
    }

    pub async fn evaluate(
        &self,
        input: EvaluationInput<'_>,
    ) -> Result<EvaluationResult, EvaluationError> {
        let prompt = prompts::evaluation_prompt(self.aspect.rubric());
        let bindings = self.bindings(&input);

        debug!(aspect = %self.aspect, model = self.model.name(), "Requesting evaluation");

        let response = self
            .model
            .invoke(&prompt, &bindings)
            .await
            .map_err(|e| {
                error!(aspect = %self.aspect, error = %e, "Error during evaluation");
                EvaluationError::Transport {
                    aspect: self.aspect,
                    source: e,
                }
            })?;

        let judgment = parse_judgment(&response);
        if !judgment.score_found {
            warn!(aspect = %self.aspect, "No score in evaluation response, defaulting to 0");
        }

        EvaluationResult::new(judgment.score, judgment.reasoning, self.range).inspect_err(|e| {
            error!(aspect = %self.aspect, error = %e, "Rejected evaluation score");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviseloops_model::ScriptedModel;

    #[test]
    fn test_parse_score_and_reasoning() {
        let judgment = parse_judgment("Score: 85\nReasoning: Covers the question well.");
        assert_eq!(judgment.score, 85);
        assert_eq!(judgment.reasoning, "Covers the question well.");
        assert!(judgment.score_found);
    }

    #[test]
    fn test_parse_extracts_exact_score_across_ranges() {
        for (min, max) in [(0, 100), (1, 10), (-5, 5), (50, 50)] {
            let range = ScoreRange::new(min, max).unwrap();
            for s in min..=max {
                let text = format!("Some preamble.\nScore: {s}\nReasoning: fine");
                let judgment = parse_judgment(&text);
                assert_eq!(judgment.score, s);
                assert!(EvaluationResult::new(judgment.score, judgment.reasoning, range).is_ok());
            }
        }
    }

    #[test]
    fn test_parse_negative_score() {
        let judgment = parse_judgment("Score: -3\nReasoning: poor");
        assert_eq!(judgment.score, -3);
        assert!(judgment.score_found);
        assert_eq!(judgment.reasoning, "poor");
    }

    #[tokio::test]
    async fn test_negative_range_keeps_judge_score() {
        let model = Arc::new(ScriptedModel::constant("judge", "Score: -3\nReasoning: poor"));
        let evaluator =
            AspectEvaluator::new(model, Aspect::Relevance, ScoreRange::new(-5, 5).unwrap());
        let result = evaluator.evaluate(input(None)).await.unwrap();
        assert_eq!(result.score(), -3);
        assert_eq!(result.reasoning(), "poor");
    }

    #[test]
    fn test_parse_is_case_insensitive_and_colon_optional() {
        let judgment = parse_judgment("SCORE 42\nREASONING the rest\nspans lines");
        assert_eq!(judgment.score, 42);
        assert_eq!(judgment.reasoning, "the rest\nspans lines");
    }

    #[test]
    fn test_missing_score_defaults_to_zero() {
        let judgment = parse_judgment("Reasoning: I could not decide.");
        assert_eq!(judgment.score, 0);
        assert!(!judgment.score_found);
        assert_eq!(judgment.reasoning, "I could not decide.");
    }

    #[test]
    fn test_reasoning_falls_back_to_text_from_score() {
        let response = "Overall fine. The score I give is 70 because \"it reads well\"";
        let judgment = parse_judgment(response);
        assert_eq!(judgment.score, 0);
        assert_eq!(
            judgment.reasoning,
            "score I give is 70 because \"it reads well"
        );
    }

    #[test]
    fn test_reasoning_fallback_keeps_everything_after_score() {
        let response = "Preamble\nScore: 60\nThe output is \"fine\"\nbut long.\"";
        let judgment = parse_judgment(response);
        assert_eq!(judgment.score, 60);
        assert_eq!(
            judgment.reasoning,
            "Score: 60\nThe output is \"fine\"\nbut long."
        );
    }

    #[test]
    fn test_reasoning_without_any_marker_is_whole_text() {
        let judgment = parse_judgment("\"Nothing useful here\"");
        assert_eq!(judgment.score, 0);
        assert_eq!(judgment.reasoning, "Nothing useful here");
    }

    #[test]
    fn test_reasoning_quotes_are_stripped() {
        let judgment = parse_judgment("Score: 9\nReasoning: \"quoted rationale\"");
        assert_eq!(judgment.reasoning, "quoted rationale");
    }

    #[test]
    fn test_overflowing_score_saturates() {
        let judgment = parse_judgment("Score: 99999999999999999999999");
        assert_eq!(judgment.score, i64::MAX);
        assert!(EvaluationResult::new(judgment.score, "", ScoreRange::default()).is_err());

        let judgment = parse_judgment("Score: -99999999999999999999999");
        assert_eq!(judgment.score, i64::MIN);
    }

    #[test]
    fn test_result_rejects_out_of_range_score() {
        let err = EvaluationResult::new(101, "too high", ScoreRange::default()).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Validation {
                score: 101,
                min: 0,
                max: 100
            }
        ));
    }

    #[test]
    fn test_invalid_range() {
        assert!(matches!(
            ScoreRange::new(10, 1),
            Err(EvaluationError::InvalidRange { min: 10, max: 1 })
        ));
    }

    fn input<'a>(previous_output: Option<&'a str>) -> EvaluationInput<'a> {
        EvaluationInput {
            system_prompt: "Write haiku",
            user_input: "About rain",
            current_output: "Rain falls",
            previous_output,
        }
    }

    #[tokio::test]
    async fn test_evaluate_binds_context_into_prompt() {
        let model = Arc::new(ScriptedModel::constant(
            "judge",
            "Score: 77\nReasoning: Decent",
        ));
        let evaluator = AspectEvaluator::new(model.clone(), Aspect::Coherence, ScoreRange::default());

        let result = evaluator.evaluate(input(None)).await.unwrap();
        assert_eq!(result.score(), 77);
        assert_eq!(result.reasoning(), "Decent");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, Aspect::Coherence.rubric());
        assert!(calls[0].user.contains("based on coherence"));
        assert!(calls[0].user.contains("Current Output: Rain falls"));
        assert!(calls[0].user.contains(NO_PREVIOUS_OUTPUT));
        assert!(calls[0].user.contains("from 0 to 100"));
    }

    #[tokio::test]
    async fn test_evaluate_passes_previous_output() {
        let model = Arc::new(ScriptedModel::constant("judge", "Score: 5"));
        let evaluator = AspectEvaluator::new(model.clone(), Aspect::Accuracy, ScoreRange::default());
        evaluator.evaluate(input(Some("Old rain"))).await.unwrap();
        assert!(model.calls()[0].user.contains("Previous Output (if available): Old rain"));
    }

    #[tokio::test]
    async fn test_evaluate_out_of_range_is_hard_failure() {
        let model = Arc::new(ScriptedModel::constant("judge", "Score: 150\nReasoning: wow"));
        let evaluator = AspectEvaluator::new(model, Aspect::Relevance, ScoreRange::default());
        let err = evaluator.evaluate(input(None)).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Validation { score: 150, .. }));
    }

    #[tokio::test]
    async fn test_evaluate_transport_error_propagates() {
        let model = Arc::new(ScriptedModel::new("judge", |_| {
            Err(ModelError::Config("offline".into()))
        }));
        let evaluator = AspectEvaluator::new(model, Aspect::Relevance, ScoreRange::default());
        let err = evaluator.evaluate(input(None)).await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Transport {
                aspect: Aspect::Relevance,
                ..
            }
        ));
    }
}
