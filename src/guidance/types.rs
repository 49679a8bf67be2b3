use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One interactive element as reported by the browser-side annotator.
/// `id` is only meaningful within the page snapshot it arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedElement {
    pub id: String,
    pub tag: String,
    pub text: String,
}

/// Persisted document for one storage key: the appended instruction blocks
/// plus every step resolution recorded against the active block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidanceRecord {
    #[serde(default)]
    pub message: String,
    /// Append-only. The last entry is the active instruction block.
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub selected_elements: Vec<ResolutionRecord>,
}

/// One persisted step resolution. A record holds at most one of these per
/// `step_number`; a later resolution for the same step replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// 1-indexed, matching the step's ordinal in the active instruction block.
    pub step_number: usize,
    pub step_text: String,
    pub selected_element: Option<AnnotatedElement>,
    pub timestamp: DateTime<Utc>,
}

/// Matcher verdict for one step.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The step requires interacting with this candidate.
    Matched(AnnotatedElement),
    /// The step needs no page interaction.
    NoInteraction,
    /// The backend reply was not usable structured data. Raw reply kept
    /// for diagnostics.
    ParseFailed(String),
}

/// Result of resolving one step index against the active instruction block.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// No instruction block has been generated for this key yet.
    NoInstructions,
    /// The requested index is past the last step.
    Completed { total_steps: usize },
    /// The step was matched (or deliberately skipped) and recorded.
    Resolved {
        step_number: usize,
        total_steps: usize,
        step_text: String,
        selected_element: Option<AnnotatedElement>,
    },
}

impl Serialize for ResolveOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = match self {
            ResolveOutcome::NoInstructions => serde_json::json!({
                "error": "No instructions found",
            }),
            ResolveOutcome::Completed { total_steps } => serde_json::json!({
                "completed": true,
                "total_steps": total_steps,
                "message": "All steps completed!",
            }),
            ResolveOutcome::Resolved {
                step_number,
                total_steps,
                step_text,
                selected_element,
            } => serde_json::json!({
                "step_number": step_number,
                "total_steps": total_steps,
                "step_text": step_text,
                "selected_element": selected_element,
                "completed": false,
            }),
        };
        value.serialize(serializer)
    }
}

/// One entry of the all-steps preview. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPreview {
    pub step_number: usize,
    pub step_text: String,
    pub selected_element: Option<AnnotatedElement>,
}

/// Result of previewing every step at once.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    NoInstructions,
    Steps(Vec<StepPreview>),
}

impl Serialize for PreviewOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = match self {
            PreviewOutcome::NoInstructions => serde_json::json!([
                { "error": "No instructions found" },
            ]),
            PreviewOutcome::Steps(previews) => serde_json::json!(previews),
        };
        value.serialize(serializer)
    }
}
