use futures::future::join_all;
use reviseloops_model::Model;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{Aspect, AspectEvaluator, EvaluationError, EvaluationInput, EvaluationResult, ScoreRange};

/// Combined evaluation across every configured aspect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEvaluation {
    overall_score: f64,
    #[serde(serialize_with = "serialize_aspect_scores")]
    aspect_scores: Vec<(Aspect, i64)>,
    combined_reasoning: String,
}

fn serialize_aspect_scores<S>(scores: &[(Aspect, i64)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(scores.iter().map(|(aspect, score)| (aspect.as_str(), score)))
}

impl AggregatedEvaluation {
    /// Aggregate per-aspect results, kept in the given order
    pub fn from_results(results: Vec<(Aspect, EvaluationResult)>) -> Result<Self, EvaluationError> {
        if results.is_empty() {
            return Err(EvaluationError::NoEvaluators);
        }

        let mut seen = HashSet::new();
        for (aspect, _) in &results {
            if !seen.insert(*aspect) {
                return Err(EvaluationError::DuplicateAspect(*aspect));
            }
        }

        let total: f64 = results.iter().map(|(_, r)| r.score() as f64).sum();
        let overall_score = total / results.len() as f64;

        let combined_reasoning = results
            .iter()
            .map(|(aspect, r)| format!("{}: {}", aspect, r.reasoning()))
            .collect::<Vec<_>>()
            .join("\n");

        let aspect_scores = results
            .into_iter()
            .map(|(aspect, r)| (aspect, r.score()))
            .collect();

        Ok(Self {
            overall_score,
            aspect_scores,
            combined_reasoning,
        })
    }

    /// Unweighted mean of the aspect scores
    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn aspect_scores(&self) -> &[(Aspect, i64)] {
        &self.aspect_scores
    }

    pub fn score_for(&self, aspect: Aspect) -> Option<i64> {
        self.aspect_scores
            .iter()
            .find(|(a, _)| *a == aspect)
            .map(|(_, score)| *score)
    }

    /// One "aspect: reasoning" line per aspect
    pub fn combined_reasoning(&self) -> &str {
        &self.combined_reasoning
    }

    /// "relevance: 80, coherence: 70" form used in prompts and logs
    pub fn aspect_scores_summary(&self) -> String {
        self.aspect_scores
            .iter()
            .map(|(aspect, score)| format!("{}: {}", aspect, score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Runs one evaluator per aspect concurrently and aggregates the results
pub struct MultiEvaluator {
    evaluators: Vec<AspectEvaluator>,
}

impl MultiEvaluator {
    pub fn new(evaluators: Vec<AspectEvaluator>) -> Result<Self, EvaluationError> {
        if evaluators.is_empty() {
            return Err(EvaluationError::NoEvaluators);
        }

        let mut seen = HashSet::new();
        for evaluator in &evaluators {
            if !seen.insert(evaluator.aspect()) {
                return Err(EvaluationError::DuplicateAspect(evaluator.aspect()));
            }
        }

        Ok(Self { evaluators })
    }

    /// One evaluator per aspect, all sharing `model`
    pub fn from_aspects(
        model: Arc<dyn Model>,
        aspects: &[Aspect],
        range: ScoreRange,
    ) -> Result<Self, EvaluationError> {
        range.validate()?;
        let evaluators = aspects
            .iter()
            .map(|aspect| AspectEvaluator::new(model.clone(), *aspect, range))
            .collect();
        Self::new(evaluators)
    }

    pub fn aspects(&self) -> Vec<Aspect> {
        self.evaluators.iter().map(|e| e.aspect()).collect()
    }

    /// Evaluate every aspect. All requests run to completion; if any of
    /// them failed, the first failure in aspect order is returned.
    pub async fn evaluate(
        &self,
        input: EvaluationInput<'_>,
    ) -> Result<AggregatedEvaluation, EvaluationError> {
        debug!(aspects = self.evaluators.len(), "Dispatching aspect evaluations");

        let results = join_all(self.evaluators.iter().map(|e| e.evaluate(input))).await;

        let paired = self
            .evaluators
            .iter()
            .zip(results)
            .map(|(evaluator, result)| result.map(|r| (evaluator.aspect(), r)))
            .collect::<Result<Vec<_>, _>>()?;

        let aggregated = AggregatedEvaluation::from_results(paired)?;

        info!(
            overall_score = aggregated.overall_score(),
            aspect_scores = %aggregated.aspect_scores_summary(),
            "Evaluation completed"
        );

        Ok(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviseloops_model::{ModelError, ScriptedModel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn input() -> EvaluationInput<'static> {
        EvaluationInput {
            system_prompt: "sys",
            user_input: "user",
            current_output: "out",
            previous_output: None,
        }
    }

    /// Judge whose score depends on which rubric it was asked to apply
    fn judge_by_rubric(scores: &'static [(Aspect, i64)]) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel::new("judge", move |request| {
            let (aspect, score) = scores
                .iter()
                .find(|(aspect, _)| request.system == aspect.rubric())
                .ok_or_else(|| ModelError::Config("unexpected rubric".into()))?;
            Ok(format!("Score: {}\nReasoning: {} looks ok", score, aspect))
        }))
    }

    #[tokio::test]
    async fn test_overall_score_is_mean() {
        static SCORES: [(Aspect, i64); 3] = [
            (Aspect::Relevance, 80),
            (Aspect::Coherence, 71),
            (Aspect::Accuracy, 90),
        ];
        let evaluator = MultiEvaluator::from_aspects(
            judge_by_rubric(&SCORES),
            &[Aspect::Relevance, Aspect::Coherence, Aspect::Accuracy],
            ScoreRange::default(),
        )
        .unwrap();

        let result = evaluator.evaluate(input()).await.unwrap();
        assert!((result.overall_score() - 241.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.aspect_scores().len(), 3);
        assert_eq!(result.score_for(Aspect::Coherence), Some(71));
        assert_eq!(
            result.combined_reasoning(),
            "relevance: relevance looks ok\ncoherence: coherence looks ok\naccuracy: accuracy looks ok"
        );
        assert_eq!(
            result.aspect_scores_summary(),
            "relevance: 80, coherence: 71, accuracy: 90"
        );
    }

    #[tokio::test]
    async fn test_one_failure_fails_whole_evaluation_after_all_complete() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let model = Arc::new(ScriptedModel::new("judge", move |request| {
            counter.fetch_add(1, Ordering::SeqCst);
            if request.system == Aspect::Coherence.rubric() {
                Err(ModelError::Config("rate limited".into()))
            } else {
                Ok("Score: 50".to_string())
            }
        }));
        let evaluator = MultiEvaluator::from_aspects(
            model,
            &[Aspect::Relevance, Aspect::Coherence, Aspect::Accuracy],
            ScoreRange::default(),
        )
        .unwrap();

        let err = evaluator.evaluate(input()).await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Transport {
                aspect: Aspect::Coherence,
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_duplicate_aspect_rejected() {
        let model: Arc<dyn Model> = Arc::new(ScriptedModel::constant("judge", "Score: 1"));
        let result = MultiEvaluator::from_aspects(
            model,
            &[Aspect::Relevance, Aspect::Relevance],
            ScoreRange::default(),
        );
        assert!(matches!(
            result,
            Err(EvaluationError::DuplicateAspect(Aspect::Relevance))
        ));
    }

    #[test]
    fn test_no_aspects_rejected() {
        let model: Arc<dyn Model> = Arc::new(ScriptedModel::constant("judge", "Score: 1"));
        let result = MultiEvaluator::from_aspects(model, &[], ScoreRange::default());
        assert!(matches!(result, Err(EvaluationError::NoEvaluators)));
    }

    #[test]
    fn test_aspect_scores_serialize_as_ordered_map() {
        let range = ScoreRange::default();
        let aggregated = AggregatedEvaluation::from_results(vec![
            (Aspect::Simplicity, EvaluationResult::new(40, "wordy", range).unwrap()),
            (Aspect::Accuracy, EvaluationResult::new(60, "ok", range).unwrap()),
        ])
        .unwrap();
        let json = serde_json::to_string(&aggregated).unwrap();
        assert_eq!(
            json,
            r#"{"overall_score":50.0,"aspect_scores":{"simplicity":40,"accuracy":60},"combined_reasoning":"simplicity: wordy\naccuracy: ok"}"#
        );
    }
}
