use serde::{Deserialize, Serialize};

use crate::prompts;

/// A rubric dimension scored independently by its own evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Relevance,
    Coherence,
    Accuracy,
    Simplicity,
}

impl Aspect {
    pub const ALL: [Aspect; 4] = [
        Aspect::Relevance,
        Aspect::Coherence,
        Aspect::Accuracy,
        Aspect::Simplicity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Relevance => "relevance",
            Aspect::Coherence => "coherence",
            Aspect::Accuracy => "accuracy",
            Aspect::Simplicity => "simplicity",
        }
    }

    /// System prompt instructing the judge model how to score this aspect
    pub fn rubric(&self) -> &'static str {
        match self {
            Aspect::Relevance => prompts::RELEVANCE_RUBRIC,
            Aspect::Coherence => prompts::COHERENCE_RUBRIC,
            Aspect::Accuracy => prompts::ACCURACY_RUBRIC,
            Aspect::Simplicity => prompts::SIMPLICITY_RUBRIC,
        }
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(Aspect::Relevance),
            "coherence" => Ok(Aspect::Coherence),
            "accuracy" => Ok(Aspect::Accuracy),
            "simplicity" => Ok(Aspect::Simplicity),
            _ => Err(format!("Unknown evaluation aspect: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_aspects() {
        for aspect in Aspect::ALL {
            assert_eq!(aspect.as_str().parse::<Aspect>().unwrap(), aspect);
        }
        assert_eq!(" Coherence ".parse::<Aspect>().unwrap(), Aspect::Coherence);
    }

    #[test]
    fn test_unknown_aspect_fails() {
        let err = "fluency".parse::<Aspect>().unwrap_err();
        assert!(err.contains("fluency"));
    }

    #[test]
    fn test_every_rubric_demands_score_format() {
        for aspect in Aspect::ALL {
            assert!(aspect.rubric().contains("Score:"), "{aspect}");
            assert!(aspect.rubric().contains("Reasoning:"), "{aspect}");
        }
    }
}
