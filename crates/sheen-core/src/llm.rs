use serde::Deserialize;

use crate::config::{resolve_api_key, LlmConfig};
use crate::error::{Result, SheenError};
use crate::model::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_ENV_VAR: &str = "OPENAI_API_KEY";

/// OpenAI-compatible chat-completion client holding the upstream credential.
///
/// Model, temperature and token caps come from [`LlmConfig`] only. Each call
/// makes exactly one request; failures are never retried.
pub struct CompletionClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.config.model)
            .field("base_url", &self.base_url())
            .finish()
    }
}

#[derive(Deserialize)]
struct CompletionEnvelope {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionClient {
    /// Fails with [`SheenError::Config`] when no credential can be resolved.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(config, DEFAULT_ENV_VAR)
            .ok_or_else(|| SheenError::Config("OpenAI API key not configured".into()))?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// Chat-mode completion with the chat token cap.
    pub async fn complete_chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.complete(messages, self.config.chat_max_tokens).await
    }

    /// Routine-mode completion with the routine token cap.
    pub async fn complete_routine(&self, messages: &[ChatMessage]) -> Result<String> {
        self.complete(messages, self.config.routine_max_tokens).await
    }

    /// POST {base_url}/v1/chat/completions and return the first choice's text unmodified.
    pub async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url());

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": self.config.temperature,
        });

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            max_tokens,
            "sending completion request"
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SheenError::Upstream(format!("OpenAI API request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let message = upstream_error_message(&text);
            tracing::warn!(%status, "completion request rejected: {message}");
            return Err(SheenError::Upstream(format!("OpenAI API Error: {message}")));
        }

        let envelope: CompletionEnvelope = resp.json().await.map_err(|e| {
            SheenError::Upstream(format!("OpenAI API response parse error: {e}"))
        })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SheenError::Upstream("OpenAI API response missing content".into()))
    }
}

/// `error.message` from an error body, or `"Unknown error"`.
fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string())
}
