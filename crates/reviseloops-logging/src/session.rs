use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Session header and footer lines of the JSONL transcript.
/// Iteration lines carry the caller's log entry with `"type": "iteration"`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLine {
    SessionStart {
        timestamp: DateTime<Utc>,
        system_prompt: String,
        user_input: String,
        agent_model: String,
        reviser_model: String,
        evaluator_model: Option<String>,
        aspects: Vec<String>,
        max_iterations: usize,
        target_score: Option<f64>,
    },
    SessionEnd {
        stop_reason: String,
        iterations: usize,
        revisions: usize,
        final_score: Option<f64>,
        error: Option<String>,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Model names and loop bounds recorded at the top of a session
#[derive(Debug, Clone, Default)]
pub struct SessionHeader<'a> {
    pub system_prompt: &'a str,
    pub user_input: &'a str,
    pub agent_model: &'a str,
    pub reviser_model: &'a str,
    pub evaluator_model: Option<&'a str>,
    pub aspects: Vec<String>,
    pub max_iterations: usize,
    pub target_score: Option<f64>,
}

/// Writes a revision session as JSONL.
pub struct SessionWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SessionWriter {
    /// Create a session file in `sessions_dir`, named from the current UTC
    /// timestamp and a short hash of the user input.
    pub fn new(sessions_dir: &Path, user_input: &str) -> io::Result<Self> {
        fs::create_dir_all(sessions_dir)?;

        let now = Utc::now();
        let timestamp_str = now.format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(user_input.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let filename = format!("{}_{}.jsonl", timestamp_str, short_hash);
        let path = sessions_dir.join(filename);

        let file = File::create(&path)?;
        let writer = BufWriter::new(file);

        Ok(Self {
            file: Mutex::new(writer),
            path,
        })
    }

    /// Returns the path to the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(&self, header: &SessionHeader<'_>) {
        let line = SessionLine::SessionStart {
            timestamp: Utc::now(),
            system_prompt: header.system_prompt.to_string(),
            user_input: header.user_input.to_string(),
            agent_model: header.agent_model.to_string(),
            reviser_model: header.reviser_model.to_string(),
            evaluator_model: header.evaluator_model.map(String::from),
            aspects: header.aspects.clone(),
            max_iterations: header.max_iterations,
            target_score: header.target_score,
        };
        self.write_value(serde_json::to_value(&line).ok());
    }

    /// Write one iteration. `entry` must serialize to a JSON object.
    pub fn write_iteration<T: Serialize>(&self, entry: &T) {
        let value = serde_json::to_value(entry).ok().and_then(|mut value| {
            let obj = value.as_object_mut()?;
            obj.insert("type".to_string(), "iteration".into());
            Some(value)
        });
        self.write_value(value);
    }

    pub fn write_end(
        &self,
        stop_reason: &str,
        iterations: usize,
        revisions: usize,
        final_score: Option<f64>,
        error: Option<&str>,
        duration_secs: f64,
    ) {
        let line = SessionLine::SessionEnd {
            stop_reason: stop_reason.to_string(),
            iterations,
            revisions,
            final_score,
            error: error.map(String::from),
            duration_secs,
            timestamp: Utc::now(),
        };
        self.write_value(serde_json::to_value(&line).ok());
    }

    fn write_value(&self, value: Option<serde_json::Value>) {
        let Some(value) = value else {
            return;
        };
        if let Ok(mut writer) = self.file.lock() {
            let _ = writeln!(writer, "{}", value);
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Entry {
        iteration: usize,
        revised_output: &'static str,
    }

    #[test]
    fn test_session_transcript_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SessionWriter::new(dir.path(), "explain rain").unwrap();

        writer.write_start(&SessionHeader {
            system_prompt: "be brief",
            user_input: "explain rain",
            agent_model: "gpt-4o",
            reviser_model: "claude",
            evaluator_model: Some("gpt-4o-mini"),
            aspects: vec!["relevance".into()],
            max_iterations: 3,
            target_score: Some(90.0),
        });
        writer.write_iteration(&Entry {
            iteration: 1,
            revised_output: "Water falls.",
        });
        writer.write_end("converged", 1, 2, Some(80.0), None, 1.5);

        let name = writer.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".jsonl"));

        let content = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "session_start");
        assert_eq!(lines[0]["aspects"][0], "relevance");
        assert_eq!(lines[1]["type"], "iteration");
        assert_eq!(lines[1]["revised_output"], "Water falls.");
        assert_eq!(lines[2]["type"], "session_end");
        assert_eq!(lines[2]["stop_reason"], "converged");
        assert!(lines[2]["error"].is_null());
    }

    #[test]
    fn test_creates_missing_sessions_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = dir.path().join("output").join("sessions");
        let writer = SessionWriter::new(&sessions, "explain rain").unwrap();

        assert_eq!(writer.path().parent(), Some(sessions.as_path()));
        // sha256("explain rain") prefix
        let mut hasher = Sha256::new();
        hasher.update(b"explain rain");
        let expected = &hex::encode(hasher.finalize())[..6];
        let name = writer.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(&format!("_{expected}.jsonl")));
    }
}
