use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Endpoint the panel talks to when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// What came back from the endpoint.
///
/// The body is not schema-checked: any JSON document is accepted and a
/// missing or non-string `response` field simply yields no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: Option<String>,
}

impl ChatReply {
    fn from_json(value: &Value) -> Self {
        Self {
            response: value
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Text to show as the assistant turn; empty when the field was absent.
    pub fn into_content(self) -> String {
        self.response.unwrap_or_default()
    }
}

/// Every way a chat request can fail. The panel treats them all alike.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request task ended abnormally: {0}")]
    Aborted(String),
}

/// The one network call the panel makes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatReply, RequestFailure>;
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send(&self, message: &str) -> Result<ChatReply, RequestFailure> {
        // `.json()` also sets Content-Type: application/json
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|source| RequestFailure::Transport {
                url: self.endpoint.clone(),
                source,
            })?;

        // Status is deliberately not checked; only the body decides
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "chat endpoint returned non-success status");
        }

        let body = response.text().await.map_err(RequestFailure::Body)?;
        let value: Value = serde_json::from_str(&body)?;
        Ok(ChatReply::from_json(&value))
    }
}
