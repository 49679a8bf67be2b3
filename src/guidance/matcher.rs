use std::sync::Arc;

use crate::config::RoleEntry;
use crate::errors::HandrailResult;
use crate::guidance::types::{AnnotatedElement, MatchOutcome};
use crate::reasoning::service::{ReasoningRequest, ReasoningService};

/// Maps one instruction step onto one annotated element by asking the
/// reasoning backend, then validating the answer against the candidate set.
pub struct ElementMatcher {
    service: Arc<dyn ReasoningService>,
    role: RoleEntry,
}

fn build_prompt(step: &str, candidates: &[AnnotatedElement]) -> HandrailResult<String> {
    let elements_json = serde_json::to_string_pretty(candidates)?;
    Ok(format!(
        r#"You are helping an elderly person navigate a webpage step-by-step.

Current instruction step:
{step}

Available interactive elements on the page:
{elements_json}

Task:
1. Decide if this step requires clicking or interacting with an element on the page
2. If YES: find the SINGLE BEST matching element from the list above
3. If NO (step is informational only): return null

IMPORTANT:
- Respond with ONLY the complete JSON object of the matching element (e.g., {{"id": "ai-5", "tag": "button", "text": "Unmute"}})
- If no interaction is needed, respond with: null
- Do not add any explanation or extra text
- Return the element exactly as it appears in the list"#
    ))
}

impl ElementMatcher {
    pub fn new(service: Arc<dyn ReasoningService>, role: RoleEntry) -> Self {
        Self { service, role }
    }

    /// Decides whether `step` needs a page interaction and, if so, which
    /// candidate it targets. The prompt carries the candidate list verbatim,
    /// so the backend can only reference elements by their given ids. The
    /// backend is consulted even when `candidates` is empty. Transport
    /// failures propagate; unusable replies come back as `ParseFailed`.
    pub async fn match_step(
        &self,
        step: &str,
        candidates: &[AnnotatedElement],
    ) -> HandrailResult<MatchOutcome> {
        let prompt = build_prompt(step, candidates)?;
        tracing::info!(step = %step, candidates = candidates.len(), "selecting element for step");

        let reply = self
            .service
            .invoke(ReasoningRequest::for_role(prompt, &self.role))
            .await?;

        Ok(Self::parse_reply(reply.trim(), candidates))
    }

    fn parse_reply(reply: &str, candidates: &[AnnotatedElement]) -> MatchOutcome {
        if reply.is_empty() || reply.eq_ignore_ascii_case("null") {
            tracing::info!("no element interaction needed for this step");
            return MatchOutcome::NoInteraction;
        }

        let parsed: AnnotatedElement = match serde_json::from_str(reply) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, reply = %reply, "reply is not an element object");
                return MatchOutcome::ParseFailed(reply.to_string());
            }
        };

        // Hand back the stored candidate so the id stays byte-identical to
        // the snapshot's. A reply naming an unknown id is a parse failure,
        // not a match.
        match candidates.iter().find(|c| c.id == parsed.id) {
            Some(candidate) => {
                tracing::info!(id = %candidate.id, "selected element");
                MatchOutcome::Matched(candidate.clone())
            }
            None => {
                tracing::warn!(id = %parsed.id, "reply references an id outside the candidate set");
                MatchOutcome::ParseFailed(reply.to_string())
            }
        }
    }
}
