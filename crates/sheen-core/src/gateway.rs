//! Completion boundary between a session and the upstream model.
//!
//! [`RelayClient`] is the production path for clients: it talks to the relay,
//! which holds the credential. [`CompletionClient`] also implements the trait
//! so the relay itself answers through the same interface.

use serde::{Deserialize, Deserializer, Serialize};

use crate::assemble;
use crate::error::{Result, SheenError};
use crate::llm::CompletionClient;
use crate::model::{ChatMessage, RoutineProduct, UserProfile};

// -- Wire types --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineRequest {
    pub product_data: Vec<RoutineProduct>,
    /// An unreadable profile is dropped rather than failing the request.
    #[serde(
        default,
        deserialize_with = "lenient_profile",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_profile: Option<UserProfile>,
}

fn lenient_profile<'de, D>(deserializer: D) -> std::result::Result<Option<UserProfile>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value(value) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!("ignoring unreadable userProfile: {e}");
            None
        }
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineResponse {
    pub routine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Gateway --

pub trait CompletionGateway: Send + Sync {
    /// Free-form reply to an assembled history.
    fn chat(
        &self,
        history: &[ChatMessage],
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Routine text for the given products.
    fn generate_routine(
        &self,
        request: &RoutineRequest,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

impl CompletionGateway for CompletionClient {
    async fn chat(&self, history: &[ChatMessage]) -> Result<String> {
        let messages = assemble::finalize_chat_history(history.to_vec());
        self.complete_chat(&messages).await
    }

    async fn generate_routine(&self, request: &RoutineRequest) -> Result<String> {
        let profile = request.user_profile.clone().unwrap_or_default();
        let messages = assemble::assemble_routine(&profile, &request.product_data);
        self.complete_routine(&messages).await
    }
}

/// HTTP client for the relay's `/chat` and `/generate-routine` endpoints.
#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SheenError::Upstream(format!("Relay request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let message = resp
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(%status, path, "relay returned an error: {message}");
            return Err(SheenError::Upstream(message));
        }

        resp.json()
            .await
            .map_err(|e| SheenError::Upstream(format!("Relay response parse error: {e}")))
    }
}

impl CompletionGateway for RelayClient {
    async fn chat(&self, history: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            conversation_history: history.to_vec(),
        };
        let resp: ChatResponse = self.post("/chat", &body).await?;
        Ok(resp.response)
    }

    async fn generate_routine(&self, request: &RoutineRequest) -> Result<String> {
        let resp: RoutineResponse = self.post("/generate-routine", request).await?;
        Ok(resp.routine)
    }
}
