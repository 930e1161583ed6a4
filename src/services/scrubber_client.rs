use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

/// Removes identifying details from free text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scrubber: Send + Sync {
    async fn scrub(&self, text: &str) -> Result<String, ScrubError>;
}

/// Anonymization service client (`POST /anonymize`).
#[derive(Clone)]
pub struct HttpScrubber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScrubber {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScrubError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Scrubber for HttpScrubber {
    async fn scrub(&self, text: &str) -> Result<String, ScrubError> {
        let response = self
            .client
            .post(format!("{}/anonymize", self.base_url))
            .json(&AnonymizeRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScrubError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: AnonymizeResponse = response.json().await?;
        Ok(body.anonymized)
    }
}

#[derive(Serialize)]
struct AnonymizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct AnonymizeResponse {
    anonymized: String,
}
