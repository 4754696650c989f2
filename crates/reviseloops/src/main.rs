mod config;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use reviseloops_core::{LoopRunner, RevisionInput, RevisionResult, StopReason};
use reviseloops_eval::MultiEvaluator;
use reviseloops_logging::{init_tracing, LogFormat, Logger, SessionHeader, SessionWriter};
use reviseloops_model::{create_model_from_env, ModelSettings};

use crate::config::ProjectConfig;

#[derive(Parser, Debug)]
#[command(
    name = "reviseloops",
    about = "Evaluate, critique and revise model output until it scores well",
    version,
    author
)]
struct Cli {
    /// Config file (default: ./reviseloops.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// System prompt the output was produced under (or reads from prompt.md if not provided)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to system prompt file (default: ./prompt.md)
    #[arg(long, default_value = "prompt.md")]
    prompt_file: PathBuf,

    /// The user request the output answers
    #[arg(short, long)]
    user_input: String,

    /// Output to start revising from
    #[arg(short, long, conflicts_with = "initial_output_file")]
    initial_output: Option<String>,

    /// Read the output to start revising from a file
    #[arg(long)]
    initial_output_file: Option<PathBuf>,

    /// Maximum iterations
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Stop once the overall score reaches this
    #[arg(short, long)]
    target_score: Option<f64>,

    /// Revise without scoring
    #[arg(long)]
    no_eval: bool,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatChoice>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Directory for debug files and session transcripts (default: ./output)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write final output, revision history and a Markdown report
    #[arg(long)]
    debug: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
    Silent,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
            LogFormatChoice::Silent => LogFormat::Silent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;

    // Load config, then let flags win
    let mut config = match cli.config {
        Some(ref path) => ProjectConfig::load_from(path)?,
        None => ProjectConfig::load(&working_dir)?.unwrap_or_default(),
    };
    apply_overrides(&cli, &mut config);
    config.validate()?;

    let log_format: LogFormat = match cli.log_format {
        Some(choice) => choice.into(),
        None => config.log_format()?,
    };
    init_tracing(&config.logging.level, log_format);

    let input = get_input(&cli, &working_dir)?;
    let aspects = config.aspects()?;
    let score_range = config.score_range()?;
    let settings = config.loop_settings();
    let evaluate = config.evaluation.enabled;

    if cli.dry_run {
        println!("=== Dry Run ===");
        println!("Prompt: {}", preview(&input.system_prompt));
        println!("User input: {}", preview(&input.user_input));
        println!("Initial output: {}", preview(input.starting_output()));
        println!("Agent model: {}", describe(&config.llm.agent_model));
        println!("Reviser model: {}", describe(&config.llm.reviser_model));
        if evaluate {
            println!("Evaluator model: {}", describe(&config.llm.evaluator_model));
            let names: Vec<String> = aspects.iter().map(ToString::to_string).collect();
            println!("Aspects: {}", names.join(", "));
            println!("Score range: [{}, {}]", score_range.min, score_range.max);
            println!("Target score: {}", settings.target_score);
        } else {
            println!("Evaluation: disabled");
        }
        println!("Max iterations: {}", settings.max_iterations);
        println!("Output dir: {}", config.output.dir.display());
        println!("Debug files: {}", config.output.debug);
        return Ok(());
    }

    // Create models
    let agent = create_model_from_env(&config.llm.agent_model)
        .context("Failed to create agent model")?;
    let reviser = create_model_from_env(&config.llm.reviser_model)
        .context("Failed to create reviser model")?;
    let evaluator = if evaluate {
        let judge = create_model_from_env(&config.llm.evaluator_model)
            .context("Failed to create evaluator model")?;
        Some(MultiEvaluator::from_aspects(judge, &aspects, score_range)?)
    } else {
        None
    };

    // Session transcript
    let session = SessionWriter::new(&config.output.sessions_dir(), &input.user_input)
        .context("Failed to create session file")?;
    let agent_name = describe(&config.llm.agent_model);
    let reviser_name = describe(&config.llm.reviser_model);
    let evaluator_name = describe(&config.llm.evaluator_model);
    session.write_start(&SessionHeader {
        system_prompt: &input.system_prompt,
        user_input: &input.user_input,
        agent_model: &agent_name,
        reviser_model: &reviser_name,
        evaluator_model: evaluate.then_some(evaluator_name.as_str()),
        aspects: if evaluate {
            aspects.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        },
        max_iterations: settings.max_iterations,
        target_score: evaluate.then_some(settings.target_score),
    });

    // Create loop runner
    let logger = Arc::new(Logger::new(log_format));
    let mut runner = LoopRunner::new(agent.as_ref(), reviser.as_ref(), logger)
        .with_settings(settings)
        .with_session(&session);
    if let Some(ref evaluator) = evaluator {
        runner = runner.with_evaluator(evaluator);
    }

    // Run the loop
    let result = runner.run(&input).await?;

    session.write_end(
        result.stop_reason.as_str(),
        result.iterations,
        result.revision_history.len().saturating_sub(1),
        result.final_score(),
        result.error.as_deref(),
        result.total_duration_secs,
    );

    if config.output.debug {
        let written = output::write_output_files(&config.output.dir, &result)?;
        for path in written {
            eprintln!("Wrote {}", path.display());
        }
    }

    // Output result
    if cli.json_output {
        let json = serde_json::to_string_pretty(&result)?;
        println!("{}", json);
    } else {
        print_outcome(&result);
    }

    // Exit with appropriate code
    std::process::exit(result.exit_code());
}

fn apply_overrides(cli: &Cli, config: &mut ProjectConfig) {
    if let Some(max) = cli.max_iterations {
        config.reviser.max_iterations = max;
    }
    if let Some(target) = cli.target_score {
        config.reviser.target_score = target;
    }
    if cli.no_eval {
        config.evaluation.enabled = false;
    }
    if let Some(ref dir) = cli.output_dir {
        config.output.dir = dir.clone();
    }
    if cli.debug {
        config.output.debug = true;
    }
}

fn get_input(cli: &Cli, working_dir: &Path) -> Result<RevisionInput> {
    let prompt = get_prompt(cli, working_dir)?;
    let mut input = RevisionInput::new(prompt, cli.user_input.clone());

    if let Some(ref output) = cli.initial_output {
        input = input.with_initial_output(output.clone());
    } else if let Some(ref path) = cli.initial_output_file {
        let content = std::fs::read_to_string(resolve(path, working_dir))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        input = input.with_initial_output(content.trim().to_string());
    }

    Ok(input)
}

fn get_prompt(cli: &Cli, working_dir: &Path) -> Result<String> {
    // Prefer --prompt flag
    if let Some(ref prompt) = cli.prompt {
        return Ok(prompt.clone());
    }

    // Try to read from prompt file
    let prompt_path = resolve(&cli.prompt_file, working_dir);

    if prompt_path.exists() {
        let content =
            std::fs::read_to_string(&prompt_path).context("Failed to read prompt file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No prompt provided. Use --prompt or create a {} file",
            cli.prompt_file.display()
        )
    }
}

fn resolve(path: &Path, working_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn describe(settings: &ModelSettings) -> String {
    format!("{}/{}", settings.provider, settings.name)
}

fn preview(text: &str) -> String {
    if text.chars().count() > 100 {
        format!("{}...", text.chars().take(100).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_outcome(result: &RevisionResult) {
    let headline = match result.stop_reason {
        StopReason::TargetScoreReached => "=== TARGET SCORE REACHED ===".green().bold(),
        StopReason::Converged => "=== CONVERGED ===".green().bold(),
        StopReason::MaxIterationsExhausted => "=== INCOMPLETE ===".yellow().bold(),
        StopReason::ErrorAborted => "=== FAILED ===".red().bold(),
    };

    eprintln!();
    eprintln!("{}", headline);
    eprintln!("Iterations: {}", result.iterations);
    eprintln!(
        "Revisions accepted: {}",
        result.revision_history.len().saturating_sub(1)
    );
    if let Some(score) = result.final_score() {
        eprintln!("Final score: {:.2}", score);
    }
    if let Some(ref error) = result.error {
        eprintln!("Error after {} iteration(s): {}", result.iterations, error);
    }
    if result.stop_reason == StopReason::MaxIterationsExhausted {
        eprintln!("The output may not have reached the target score.");
    }
    if !result.final_suggestions.is_empty() {
        eprintln!("Last suggestions:");
        for suggestion in &result.final_suggestions {
            eprintln!("  {}", suggestion);
        }
    }
    eprintln!("Duration: {:.1}s", result.total_duration_secs);
    eprintln!();

    println!("{}", result.final_output);
}
