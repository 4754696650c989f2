//! Project configuration file support for reviseloops.
//!
//! Loads configuration from `reviseloops.toml` in the working directory, or
//! from an explicit `--config` path.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use reviseloops_core::LoopSettings;
use reviseloops_eval::{Aspect, ScoreRange};
use reviseloops_logging::LogFormat;
use reviseloops_model::{ModelSettings, Provider};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "reviseloops.toml";

/// Project-level configuration loaded from `reviseloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub reviser: ReviserConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[evaluation]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Aspect names, checked against the known rubrics by [`ProjectConfig::validate`]
    #[serde(default = "default_aspects")]
    pub aspects: Vec<String>,
    #[serde(default)]
    pub score_range: ScoreRange,
    /// Run without an evaluator when false
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            aspects: default_aspects(),
            score_range: ScoreRange::default(),
            enabled: true,
        }
    }
}

/// `[reviser]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviserConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_target_score")]
    pub target_score: f64,
}

impl Default for ReviserConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            target_score: default_target_score(),
        }
    }
}

/// `[llm.*]` - one model per role
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Writes revisions
    #[serde(default = "default_agent_model")]
    pub agent_model: ModelSettings,
    /// Writes feedback
    #[serde(default = "default_reviser_model")]
    pub reviser_model: ModelSettings,
    /// Scores aspects
    #[serde(default = "default_evaluator_model")]
    pub evaluator_model: ModelSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            agent_model: default_agent_model(),
            reviser_model: default_reviser_model(),
            evaluator_model: default_evaluator_model(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// `[output]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Write the final output and revision history files
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl OutputConfig {
    /// Session transcripts live under the output directory
    pub fn sessions_dir(&self) -> PathBuf {
        self.dir.join("sessions")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug: false,
            dir: default_output_dir(),
        }
    }
}

fn default_aspects() -> Vec<String> {
    [Aspect::Relevance, Aspect::Coherence, Aspect::Accuracy]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> usize {
    3
}

fn default_target_score() -> f64 {
    90.0
}

fn default_agent_model() -> ModelSettings {
    ModelSettings::new(Provider::OpenAi, "gpt-4o")
}

fn default_reviser_model() -> ModelSettings {
    ModelSettings::new(Provider::Anthropic, "claude-3-5-sonnet-latest")
}

fn default_evaluator_model() -> ModelSettings {
    let mut settings = ModelSettings::new(Provider::OpenAi, "gpt-4o-mini");
    settings.temperature = 0.0;
    settings
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        Self::load_from(&config_path).map(Some)
    }

    /// Load configuration from an explicit path. A missing file is an error.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check everything that cannot be expressed in the TOML schema
    pub fn validate(&self) -> Result<()> {
        self.aspects()?;
        let range = self.score_range()?;

        if self.reviser.max_iterations == 0 {
            bail!("reviser.max_iterations must be at least 1");
        }

        let target = self.reviser.target_score;
        if target.is_nan() || target < range.min as f64 || target > range.max as f64 {
            bail!(
                "reviser.target_score {} is outside the score range [{}, {}]",
                target,
                range.min,
                range.max
            );
        }

        self.log_format()?;
        Ok(())
    }

    /// Configured aspects in order. Unknown and repeated names are errors.
    pub fn aspects(&self) -> Result<Vec<Aspect>> {
        if self.evaluation.aspects.is_empty() {
            bail!("evaluation.aspects must name at least one aspect");
        }

        let mut seen = HashSet::new();
        let mut aspects = Vec::with_capacity(self.evaluation.aspects.len());
        for name in &self.evaluation.aspects {
            let aspect: Aspect = name.parse().map_err(anyhow::Error::msg)?;
            if !seen.insert(aspect) {
                bail!("evaluation.aspects lists {} more than once", aspect);
            }
            aspects.push(aspect);
        }
        Ok(aspects)
    }

    pub fn score_range(&self) -> Result<ScoreRange> {
        let range = self.evaluation.score_range;
        range.validate()?;
        Ok(range)
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.logging.format.parse().map_err(anyhow::Error::msg)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_iterations: self.reviser.max_iterations,
            target_score: self.reviser.target_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());

        let config = ProjectConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.aspects().unwrap(),
            vec![Aspect::Relevance, Aspect::Coherence, Aspect::Accuracy]
        );
        assert_eq!(config.score_range().unwrap(), ScoreRange { min: 0, max: 100 });
        assert_eq!(config.loop_settings(), LoopSettings::default());
        assert!(config.evaluation.enabled);
        assert!(!config.output.debug);
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(config.output.sessions_dir(), PathBuf::from("output/sessions"));
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[evaluation]
aspects = ["Relevance", "simplicity"]
score_range = { min = 1, max = 10 }

[reviser]
max_iterations = 5
target_score = 8.5

[llm.agent_model]
provider = "anthropic"
name = "claude-3-5-haiku-latest"
temperature = 0.2

[llm.evaluator_model]
provider = "openai"
name = "gpt-4o"
max_tokens = 256

[logging]
level = "debug"
format = "json"

[output]
debug = true
dir = "runs"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.aspects().unwrap(),
            vec![Aspect::Relevance, Aspect::Simplicity]
        );
        assert_eq!(config.score_range().unwrap(), ScoreRange { min: 1, max: 10 });
        assert_eq!(config.reviser.max_iterations, 5);
        assert_eq!(config.llm.agent_model.provider, Provider::Anthropic);
        assert_eq!(config.llm.agent_model.max_tokens, 1024);
        assert_eq!(config.llm.evaluator_model.max_tokens, 256);
        // untouched role keeps its default
        assert_eq!(config.llm.reviser_model, default_reviser_model());
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert!(config.output.debug);
        assert_eq!(config.output.dir, PathBuf::from("runs"));
        assert_eq!(config.output.sessions_dir(), PathBuf::from("runs/sessions"));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = ProjectConfig::parse("[reviser]\nmax_iteration = 2\n").unwrap_err();
        assert!(err.to_string().contains("max_iteration"));
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let result = ProjectConfig::parse("[llm.agent_model]\nprovider = \"cohere\"\nname = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_aspect_fails_validation() {
        let config = ProjectConfig::parse("[evaluation]\naspects = [\"relevance\", \"tone\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tone"));
    }

    #[test]
    fn test_duplicate_aspect_fails_validation() {
        let config =
            ProjectConfig::parse("[evaluation]\naspects = [\"coherence\", \"Coherence\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_empty_aspects_fail_validation() {
        let config = ProjectConfig::parse("[evaluation]\naspects = []\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_range_fails_validation() {
        let config =
            ProjectConfig::parse("[evaluation]\nscore_range = { min = 10, max = 1 }\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_outside_range_fails_validation() {
        let config = ProjectConfig::parse("[reviser]\ntarget_score = 101.0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target_score"));
    }

    #[test]
    fn test_zero_iterations_fails_validation() {
        let config = ProjectConfig::parse("[reviser]\nmax_iterations = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load_from(&dir.path().join("nope.toml")).is_err());
    }
}
