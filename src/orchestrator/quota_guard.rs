use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::QuotaUsage;
use crate::storage::repository::{QuotaStore, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Quota store unavailable: {0}")]
    Unavailable(#[from] RepositoryError),
}

/// Daily message allowance. The only component that increments usage.
pub struct QuotaGuard {
    store: Arc<dyn QuotaStore>,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// Checks the allowance and, when allowed, records the message in the
    /// same store operation. Unlimited owners are never written.
    pub async fn may_i_send(&self, owner_id: Uuid) -> Result<bool, QuotaError> {
        let state = self.store.quota_state(owner_id).await?;
        if state.is_unlimited() {
            return Ok(true);
        }

        let allowed = self.store.try_record_message(owner_id).await?;
        if !allowed {
            tracing::info!(
                owner = %owner_id,
                limit = state.daily_limit,
                "Daily message limit reached"
            );
        }
        Ok(allowed)
    }

    pub async fn current_usage(&self, owner_id: Uuid) -> Result<QuotaUsage, QuotaError> {
        Ok(self.store.quota_state(owner_id).await?.usage())
    }
}
