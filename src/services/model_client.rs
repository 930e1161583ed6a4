use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::internal::{HistoryEntry, OwnerContext};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub message: String,
}

/// The remote language model. Timeouts surface as errors like any other
/// failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(
        &self,
        history: &[HistoryEntry],
        system_prompt: &str,
        context: &OwnerContext,
    ) -> Result<ModelReply, ModelError>;
}

/// Talks to the model bridge over HTTP (`POST /chat`).
#[derive(Clone)]
pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpModelClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub async fn health_check(&self) -> Result<bool, ModelError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn invoke(
        &self,
        history: &[HistoryEntry],
        system_prompt: &str,
        context: &OwnerContext,
    ) -> Result<ModelReply, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            system_prompt,
            messages: history,
            owner_id: context.owner_id().to_string(),
            caller_id: context.caller_id().to_string(),
            training: context.is_training(),
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ModelError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        if chat_response.message.trim().is_empty() {
            return Err(ModelError::InvalidResponse(
                "model returned an empty message".to_string(),
            ));
        }

        Ok(ModelReply {
            message: chat_response.message,
        })
    }
}

// Request/Response Models
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    system_prompt: &'a str,
    messages: &'a [HistoryEntry],
    owner_id: String,
    caller_id: String,
    training: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: String,
}
