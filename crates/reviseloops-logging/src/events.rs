use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the revision loop.
///
/// Iteration numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        user_input: String,
        max_iterations: usize,
        target_score: Option<f64>,
        aspects: Vec<String>,
    },
    IterationStarted {
        iteration: usize,
    },
    EvaluationCompleted {
        iteration: usize,
        overall_score: f64,
        aspect_scores: String,
    },
    TargetScoreReached {
        iteration: usize,
        overall_score: f64,
        target_score: f64,
    },
    FeedbackGenerated {
        iteration: usize,
        feedback_preview: String,
    },
    RevisionAccepted {
        iteration: usize,
        suggestions: usize,
        output_chars: usize,
    },
    Converged {
        iteration: usize,
    },
    MaxIterationsReached {
        iterations: usize,
    },
    ErrorEncountered {
        iteration: usize,
        error: String,
    },
    LoopCompleted {
        iterations: usize,
        stop_reason: String,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
    /// Discard console output
    Silent,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            "silent" | "none" => Ok(LogFormat::Silent),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for loop events - handles both console output and file logging.
///
/// Write failures are ignored; logging never affects the loop.
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// A logger that drops every event
    pub fn silent() -> Self {
        Self::new(LogFormat::Silent)
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
            LogFormat::Silent => {}
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                user_input,
                max_iterations,
                target_score,
                aspects,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "reviseloops".bold().bright_white(),
                    " ".repeat(56) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Input:".dimmed(),
                    Self::truncate_with_padding(user_input, 60, 67).dimmed()
                );
                let budget = match target_score {
                    Some(target) => format!("{} iterations, target {:.1}", max_iterations, target),
                    None => format!("{} iterations, no evaluation", max_iterations),
                };
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Budget:".dimmed(),
                    Self::truncate_with_padding(&budget, 59, 66).dimmed()
                );
                if !aspects.is_empty() {
                    let _ = writeln!(
                        stderr,
                        "{}  {} {}",
                        "│".bright_blue(),
                        "Aspects:".dimmed(),
                        Self::truncate_with_padding(&aspects.join(", "), 58, 65).dimmed()
                    );
                }
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::IterationStarted { iteration } => {
                let iter_text = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(67usize.saturating_sub(iter_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluationCompleted {
                overall_score,
                aspect_scores,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "EVALUATION".bright_magenta().bold()
                );
                let _ = writeln!(
                    stderr,
                    "    Overall {:.1} ({})",
                    overall_score,
                    aspect_scores.dimmed()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::TargetScoreReached {
                overall_score,
                target_score,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {}",
                    format!(
                        "✓ Target reached: {:.1} >= {:.1}",
                        overall_score, target_score
                    )
                    .bright_green()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::FeedbackGenerated {
                feedback_preview, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "FEEDBACK".bright_cyan().bold()
                );
                for line in feedback_preview.lines() {
                    let _ = writeln!(stderr, "{} {}", "    │".dimmed(), line.dimmed());
                }
                let _ = writeln!(stderr);
            }
            LogEvent::RevisionAccepted {
                suggestions,
                output_chars,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "REVISION".bright_cyan().bold()
                );
                let _ = writeln!(
                    stderr,
                    "    {} {} {}, {} chars",
                    "→".bright_yellow(),
                    suggestions,
                    if *suggestions == 1 {
                        "suggestion"
                    } else {
                        "suggestions"
                    },
                    output_chars
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::Converged { iteration } => {
                let _ = writeln!(
                    stderr,
                    "    {}",
                    format!("✓ Revision {} reproduced the current output", iteration)
                        .bright_green()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::MaxIterationsReached { iterations } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Maximum iterations reached ({})",
                    "⚠".bright_yellow(),
                    iterations
                );
            }
            LogEvent::ErrorEncountered { iteration, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in iteration {}: {}",
                    "✗".bright_red(),
                    iteration,
                    error.bright_red()
                );
            }
            LogEvent::LoopCompleted { .. } => {
                // Printed as the final outcome by the CLI
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { max_iterations, .. } => {
                format!("[{}] loop:start max={}", timestamp, max_iterations)
            }
            LogEvent::IterationStarted { iteration } => {
                format!("[{}] iter:start:{}", timestamp, iteration)
            }
            LogEvent::EvaluationCompleted {
                iteration,
                overall_score,
                ..
            } => format!("[{}] eval:{} {:.1}", timestamp, iteration, overall_score),
            LogEvent::TargetScoreReached {
                iteration,
                overall_score,
                target_score,
            } => format!(
                "[{}] target:{} {:.1}>={:.1}",
                timestamp, iteration, overall_score, target_score
            ),
            LogEvent::FeedbackGenerated { iteration, .. } => {
                format!("[{}] feedback:{}", timestamp, iteration)
            }
            LogEvent::RevisionAccepted {
                iteration,
                suggestions,
                output_chars,
            } => format!(
                "[{}] revise:{} s={} c={}",
                timestamp, iteration, suggestions, output_chars
            ),
            LogEvent::Converged { iteration } => {
                format!("[{}] converged:{}", timestamp, iteration)
            }
            LogEvent::MaxIterationsReached { iterations } => {
                format!("[{}] loop:limit:{}", timestamp, iterations)
            }
            LogEvent::ErrorEncountered { iteration, error } => {
                format!("[{}] error:{}:{}", timestamp, iteration, error)
            }
            LogEvent::LoopCompleted {
                iterations,
                stop_reason,
                duration_secs,
            } => format!(
                "[{}] loop:done:{} {} {:.1}s",
                timestamp, iterations, stop_reason, duration_secs
            ),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let first_line = s.lines().next().unwrap_or_default();
        let truncated = if first_line.chars().count() > max_len {
            let head: String = first_line.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            first_line.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
