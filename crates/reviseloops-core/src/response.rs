use serde::{Deserialize, Serialize};

const SUGGESTIONS_MARKER: &str = "SUGGESTIONS:";
const REVISED_OUTPUT_MARKER: &str = "REVISED OUTPUT:";

/// Suggestions and candidate text extracted from a revision response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionResponse {
    pub suggestions: Vec<String>,
    pub revised_output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before any marker
    None,
    Suggestions,
    RevisedOutput,
}

impl RevisionResponse {
    /// Split a response of the form
    ///
    /// ```text
    /// SUGGESTIONS:
    /// - item
    /// REVISED OUTPUT:
    /// new text
    /// ```
    ///
    /// Marker lines are recognised by prefix after trimming. Each non-empty
    /// line in the suggestions block is one suggestion; every line after the
    /// revised-output marker belongs to the output, which is trimmed as a
    /// whole. Text before the first marker is discarded, so a response with
    /// no markers yields no suggestions and an empty output.
    pub fn parse(response: &str) -> Self {
        let mut state = ScanState::None;
        let mut suggestions = Vec::new();
        let mut output_lines = Vec::new();

        for line in response.lines() {
            let trimmed = line.trim();
            match state {
                ScanState::None | ScanState::Suggestions
                    if trimmed.starts_with(REVISED_OUTPUT_MARKER) =>
                {
                    state = ScanState::RevisedOutput;
                }
                ScanState::None if trimmed.starts_with(SUGGESTIONS_MARKER) => {
                    state = ScanState::Suggestions;
                }
                ScanState::None => {}
                ScanState::Suggestions => {
                    if !trimmed.is_empty() {
                        suggestions.push(trimmed.to_string());
                    }
                }
                ScanState::RevisedOutput => output_lines.push(line),
            }
        }

        Self {
            suggestions,
            revised_output: output_lines.join("\n").trim().to_string(),
        }
    }

    pub fn has_output(&self) -> bool {
        !self.revised_output.is_empty()
    }
}
