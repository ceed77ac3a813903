use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::model::error::{ModelError, internal_error, protocol_violation, timeout, unreachable};
use crate::model::ports::{ModelPort, ModelReply, ModelRequest};
use crate::triage::pre_scan::TurnRole;

/// Non-streaming chat-completions adapter for any OpenAI-compatible serving
/// stack (vLLM, llama.cpp server, hosted endpoints).
pub struct OpenAiCompatibleModel {
    client: Client,
    endpoint: String,
    model_id: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl OpenAiCompatibleModel {
    pub fn new(
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| internal_error(format!("http client failed to build: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            api_key,
            request_timeout,
        })
    }
}

#[async_trait]
impl ModelPort for OpenAiCompatibleModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let mut messages = vec![json!({"role": "system", "content": request.system_prompt})];
        for turn in &request.history {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": turn.text}));
        }
        messages.push(json!({"role": "user", "content": request.user_text}));

        let body = json!({
            "model": self.model_id,
            "messages": messages,
            "stream": false,
        });

        let mut builder = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                timeout(format!("model call timed out after {:?}", self.request_timeout))
            } else {
                unreachable(format!("model endpoint unreachable: {err}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(unreachable(format!(
                "model endpoint returned status {}",
                status
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| protocol_violation(format!("invalid model response body: {err}")))?;
        let text = payload
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| protocol_violation("model response missing choices[0].message.content"))?;

        tracing::debug!(
            target: "model.openai_compatible",
            model = %self.model_id,
            response_chars = text.len(),
            "model_completion_received"
        );
        Ok(ModelReply {
            text: text.to_string(),
        })
    }
}
