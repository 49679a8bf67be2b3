use std::sync::Arc;

use crate::config::RoleEntry;
use crate::errors::HandrailResult;
use crate::guidance::store::StepStore;
use crate::guidance::types::AnnotatedElement;
use crate::reasoning::service::{ReasoningRequest, ReasoningService};

/// Produces a numbered instruction block for a user request against a page
/// snapshot, and appends it to the guidance record as the new active block.
pub struct InstructionGenerator {
    service: Arc<dyn ReasoningService>,
    store: Arc<StepStore>,
    role: RoleEntry,
}

fn build_prompt(message: &str, context: &[AnnotatedElement]) -> HandrailResult<String> {
    let context_json = serde_json::to_string_pretty(context)?;
    Ok(format!(
        r#"When I mention the context, I mean the following abbreviated form of a website as a JSON of only the relevant HTML elements:
{context_json}
When I mention the prompt, I mean the following user request:
{message}
Now, follow these instructions strictly and do nothing else extra:
0. First note that as you craft your response, this is for an elderly person who struggles with the internet. Make your instructions extremely clear and easy to follow.
1. Use the context to identify the current website. Then identify what website the prompt is talking about. If they don't match, notify the user in a single sentence that they are not on a relevant website and TERMINATE ENTIRELY. In all other cases, just continue to step 2 and completely reset the current response draft.
2. Use the prompt and the context to give an answer formatted in steps that only highlight a single interactable element on the user's screen. These instructions should make no reference to the context elements, and just use plain English to describe the elements. Use the internet to find any additional information you need.
3. Set these instructions as the final output with no preface, just begin with the steps and nothing else.
4. Terminate entirely and stop all processing."#
    ))
}

impl InstructionGenerator {
    pub fn new(service: Arc<dyn ReasoningService>, store: Arc<StepStore>, role: RoleEntry) -> Self {
        Self {
            service,
            store,
            role,
        }
    }

    /// Invokes the instruct role and appends the returned block under `key`.
    /// The appended block becomes the active one for step resolution.
    /// Backend and storage failures both propagate; nothing is appended on
    /// a failed generation.
    pub async fn generate(
        &self,
        key: &str,
        message: &str,
        context: &[AnnotatedElement],
    ) -> HandrailResult<String> {
        let prompt = build_prompt(message, context)?;
        tracing::info!(key = %key, context_elements = context.len(), "generating instruction block");

        let block = self
            .service
            .invoke(ReasoningRequest::for_role(prompt, &self.role))
            .await?;

        self.store.append_instructions(key, &block)?;
        tracing::info!(key = %key, block_len = block.len(), "instruction block appended");
        Ok(block)
    }
}
