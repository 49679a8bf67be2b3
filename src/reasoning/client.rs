use async_trait::async_trait;

use crate::errors::{HandrailError, HandrailResult};
use crate::reasoning::service::{ReasoningRequest, ReasoningService};

/// HTTP client for the hosted reasoning runner.
pub struct HttpReasoningClient {
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpReasoningClient {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    async fn invoke(&self, request: ReasoningRequest) -> HandrailResult<String> {
        let body = serde_json::json!({
            "input": request.prompt,
            "model": request.models,
            "mcp_servers": request.tool_servers,
            "max_steps": request.max_steps,
            "stream": false,
        });

        tracing::debug!(
            models = ?request.models,
            max_steps = request.max_steps,
            prompt_len = request.prompt.len(),
            "sending reasoning request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(HandrailError::Reasoning(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let final_output = json["final_output"].as_str().unwrap_or("").to_string();

        tracing::info!(output_len = final_output.len(), "reasoning response received");

        Ok(final_output)
    }
}
