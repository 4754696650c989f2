//! Debug output files written after a run.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use reviseloops_core::{IterationLogEntry, RevisionResult};

pub const FINAL_OUTPUT_FILE: &str = "final_output.txt";
pub const REVISION_HISTORY_FILE: &str = "revision_history.txt";
pub const STRUCTURED_OUTPUT_FILE: &str = "structured_output.md";

const BANNER_WIDTH: usize = 50;
const MISSING: &str = "N/A";

/// Write the final output, the plain-text revision history and the
/// Markdown report into `dir`, creating it if needed. Returns the paths
/// written.
pub fn write_output_files(dir: &Path, result: &RevisionResult) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let final_path = dir.join(FINAL_OUTPUT_FILE);
    fs::write(&final_path, &result.final_output)
        .with_context(|| format!("Failed to write {}", final_path.display()))?;

    let history_path = dir.join(REVISION_HISTORY_FILE);
    write_file(&history_path, |w| {
        write_revision_history(w, &result.history_log)
    })?;

    let structured_path = dir.join(STRUCTURED_OUTPUT_FILE);
    write_file(&structured_path, |w| {
        write_structured_output(w, &result.history_log)
    })?;

    Ok(vec![final_path, history_path, structured_path])
}

fn write_file<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    render(&mut writer)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Plain-text audit trail, one banner-delimited block per iteration
pub fn write_revision_history<W: Write>(w: &mut W, log: &[IterationLogEntry]) -> io::Result<()> {
    let banner = "=".repeat(BANNER_WIDTH);

    for entry in log {
        writeln!(w, "{banner}")?;
        writeln!(w, "ITERATION {}", entry.iteration)?;
        writeln!(w, "{banner}")?;
        writeln!(w)?;

        match &entry.evaluation {
            Some(evaluation) => {
                writeln!(w, "EVALUATION:")?;
                writeln!(w, "Overall Score: {:.2}", evaluation.overall_score())?;
                writeln!(w, "Aspect Scores: {}", evaluation.aspect_scores_summary())?;
                writeln!(w, "Reasoning:\n{}", evaluation.combined_reasoning())?;
                writeln!(w)?;
            }
            None => {
                writeln!(w, "EVALUATION: Not available")?;
                writeln!(w)?;
            }
        }

        writeln!(
            w,
            "FEEDBACK:\n{}",
            entry.feedback.as_deref().unwrap_or(MISSING)
        )?;
        writeln!(w)?;

        writeln!(w, "SUGGESTIONS:")?;
        for suggestion in &entry.suggestions {
            writeln!(w, "- {}", bullet_text(suggestion))?;
        }
        writeln!(w)?;

        writeln!(
            w,
            "REVISED OUTPUT:\n{}",
            entry.revised_output.as_deref().unwrap_or(MISSING)
        )?;
        writeln!(w)?;
        writeln!(w, "{banner}")?;
        writeln!(w)?;
    }

    Ok(())
}

/// Markdown report of the run, iterations separated by `---`
pub fn write_structured_output<W: Write>(w: &mut W, log: &[IterationLogEntry]) -> io::Result<()> {
    writeln!(w, "# Revision Process Output")?;
    writeln!(w)?;
    writeln!(w, "## Revision History")?;
    writeln!(w)?;

    for (i, entry) in log.iter().enumerate() {
        writeln!(w, "### Iteration {}", entry.iteration)?;
        writeln!(w)?;

        if let Some(evaluation) = &entry.evaluation {
            writeln!(w, "#### Evaluation")?;
            writeln!(w)?;
            writeln!(w, "- Overall Score: {:.2}", evaluation.overall_score())?;
            writeln!(w, "- Aspect Scores:")?;
            for (aspect, score) in evaluation.aspect_scores() {
                writeln!(w, "  - {}: {}", aspect, score)?;
            }
            writeln!(w)?;

            writeln!(w, "#### Reasoning")?;
            writeln!(w)?;
            writeln!(w, "{}", evaluation.combined_reasoning())?;
            writeln!(w)?;
        }

        writeln!(w, "#### Suggestions")?;
        writeln!(w)?;
        for suggestion in &entry.suggestions {
            writeln!(w, "- {}", bullet_text(suggestion))?;
        }
        writeln!(w)?;

        writeln!(w, "#### Revised Output")?;
        writeln!(w)?;
        writeln!(
            w,
            "```\n{}\n```",
            entry.revised_output.as_deref().unwrap_or(MISSING)
        )?;
        writeln!(w)?;

        if i + 1 < log.len() {
            writeln!(w, "---")?;
            writeln!(w)?;
        }
    }

    Ok(())
}

/// Suggestions usually arrive already bulleted
fn bullet_text(suggestion: &str) -> &str {
    suggestion
        .strip_prefix("- ")
        .or_else(|| suggestion.strip_prefix('-'))
        .or_else(|| suggestion.strip_prefix("* "))
        .unwrap_or(suggestion)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviseloops_eval::{AggregatedEvaluation, Aspect, EvaluationResult, ScoreRange};

    fn evaluation() -> AggregatedEvaluation {
        let range = ScoreRange::default();
        AggregatedEvaluation::from_results(vec![
            (
                Aspect::Relevance,
                EvaluationResult::new(80, "on topic", range).unwrap(),
            ),
            (
                Aspect::Coherence,
                EvaluationResult::new(65, "jumps around", range).unwrap(),
            ),
        ])
        .unwrap()
    }

    fn log() -> Vec<IterationLogEntry> {
        let mut first = IterationLogEntry::new(1);
        first.evaluation = Some(evaluation());
        first.feedback = Some("Tighten the second paragraph.".into());
        first.suggestions = vec!["- Merge paragraphs".into(), "Drop the aside".into()];
        first.revised_output = Some("Better text".into());

        let mut second = IterationLogEntry::new(2);
        second.feedback = Some("Good.".into());

        vec![first, second]
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_revision_history_sections() {
        let text = render(|w| write_revision_history(w, &log()));

        assert!(text.starts_with(&format!("{}\nITERATION 1\n", "=".repeat(50))));
        assert!(text.contains("EVALUATION:\nOverall Score: 72.50\n"));
        assert!(text.contains("Aspect Scores: relevance: 80, coherence: 65\n"));
        assert!(text.contains("Reasoning:\nrelevance: on topic\ncoherence: jumps around\n"));
        assert!(text.contains("FEEDBACK:\nTighten the second paragraph.\n"));
        assert!(text.contains("SUGGESTIONS:\n- Merge paragraphs\n- Drop the aside\n"));
        assert!(text.contains("REVISED OUTPUT:\nBetter text\n"));

        assert!(text.contains("ITERATION 2\n"));
        assert!(text.contains("EVALUATION: Not available\n"));
        assert!(text.contains("REVISED OUTPUT:\nN/A\n"));
    }

    #[test]
    fn test_structured_output_markdown() {
        let text = render(|w| write_structured_output(w, &log()));

        assert!(text.starts_with("# Revision Process Output\n\n## Revision History\n\n"));
        assert!(text.contains("### Iteration 1\n\n#### Evaluation\n\n- Overall Score: 72.50\n"));
        assert!(text.contains("- Aspect Scores:\n  - relevance: 80\n  - coherence: 65\n"));
        assert!(text.contains("#### Reasoning\n\nrelevance: on topic\ncoherence: jumps around\n"));
        assert!(text.contains("#### Suggestions\n\n- Merge paragraphs\n- Drop the aside\n"));
        assert!(text.contains("#### Revised Output\n\n```\nBetter text\n```\n"));
        // one separator between two iterations, none after the last
        assert_eq!(text.matches("---\n").count(), 1);
        assert!(text.trim_end().ends_with("```\nN/A\n```"));
        // iteration 2 had no evaluation
        assert_eq!(text.matches("#### Evaluation").count(), 1);
    }

    #[test]
    fn test_write_output_files_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("output");

        let result = RevisionResult {
            final_output: "Better text".into(),
            revision_history: vec!["draft".into(), "Better text".into()],
            evaluation_history: vec![evaluation()],
            final_suggestions: Vec::new(),
            history_log: log(),
            stop_reason: reviseloops_core::StopReason::MaxIterationsExhausted,
            iterations: 2,
            error: None,
            total_duration_secs: 1.5,
        };

        let written = write_output_files(&out, &result).unwrap();
        assert_eq!(written.len(), 3);

        assert_eq!(
            fs::read_to_string(out.join(FINAL_OUTPUT_FILE)).unwrap(),
            "Better text"
        );
        assert!(fs::read_to_string(out.join(REVISION_HISTORY_FILE))
            .unwrap()
            .contains("ITERATION 2"));
        assert!(fs::read_to_string(out.join(STRUCTURED_OUTPUT_FILE))
            .unwrap()
            .starts_with("# Revision Process Output"));
    }

    #[test]
    fn test_bullet_text() {
        assert_eq!(bullet_text("- Add X"), "Add X");
        assert_eq!(bullet_text("-Add X"), "Add X");
        assert_eq!(bullet_text("* Add X"), "Add X");
        assert_eq!(bullet_text("Add X"), "Add X");
    }
}
