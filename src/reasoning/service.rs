use async_trait::async_trait;

use crate::config::RoleEntry;
use crate::errors::HandrailResult;

/// One logical exchange with the reasoning backend.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub prompt: String,
    /// Model identifiers, in preference order.
    pub models: Vec<String>,
    /// Tool servers the backend may consult while answering.
    pub tool_servers: Vec<String>,
    /// Upper bound on backend reasoning steps.
    pub max_steps: u32,
}

impl ReasoningRequest {
    pub fn for_role(prompt: String, role: &RoleEntry) -> Self {
        Self {
            prompt,
            models: role.models.clone(),
            tool_servers: role.tool_servers.clone(),
            max_steps: role.max_steps,
        }
    }
}

/// Unified reasoning backend trait. Pipeline components never talk HTTP directly;
/// they hold a `dyn ReasoningService` and tests swap in canned implementations.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Single invocation, no retries. Returns the backend's final text;
    /// callers parse any structure they expect out of it.
    async fn invoke(&self, request: ReasoningRequest) -> HandrailResult<String>;
}
