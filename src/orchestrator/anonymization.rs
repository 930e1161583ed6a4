use std::sync::Arc;
use uuid::Uuid;

use crate::services::scrubber_client::Scrubber;
use crate::storage::repository::ChatRepository;

/// Scrubs text on its way into durable storage for owners who opted in.
///
/// Never fails: a missing or unreadable setting means "off", and a scrubber
/// outage stores the original text rather than blocking the conversation.
pub struct AnonymizationFilter {
    settings: Arc<dyn ChatRepository + Send + Sync>,
    scrubber: Arc<dyn Scrubber>,
}

impl AnonymizationFilter {
    pub fn new(settings: Arc<dyn ChatRepository + Send + Sync>, scrubber: Arc<dyn Scrubber>) -> Self {
        Self { settings, scrubber }
    }

    pub async fn is_enabled(&self, owner_id: Uuid) -> bool {
        match self.settings.anonymization_enabled(owner_id).await {
            Ok(enabled) => enabled.unwrap_or(false),
            Err(e) => {
                tracing::warn!(owner = %owner_id, "Could not read anonymization setting: {}", e);
                false
            }
        }
    }

    pub async fn scrub(&self, owner_id: Uuid, text: &str) -> String {
        if !self.is_enabled(owner_id).await {
            return text.to_string();
        }

        match self.scrubber.scrub(text).await {
            Ok(anonymized) => anonymized,
            Err(e) => {
                tracing::warn!(
                    owner = %owner_id,
                    "Anonymization unavailable, storing original text: {}",
                    e
                );
                text.to_string()
            }
        }
    }
}
