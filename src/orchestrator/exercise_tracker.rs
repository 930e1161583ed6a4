use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::ExerciseRecommendation;
use crate::orchestrator::classifier::{ExerciseClassifier, KeywordClassifier, ReplyKind};
use crate::storage::repository::{ChatRepository, RepositoryError};

/// Records exercise recommendations made by the assistant and closes them
/// when the user reports back. The only writer of exercise rows.
pub struct ExerciseTracker {
    repo: Arc<dyn ChatRepository + Send + Sync>,
    classifier: Arc<dyn ExerciseClassifier>,
}

impl ExerciseTracker {
    pub fn new(repo: Arc<dyn ChatRepository + Send + Sync>) -> Self {
        Self::with_classifier(repo, Arc::new(KeywordClassifier::new()))
    }

    pub fn with_classifier(
        repo: Arc<dyn ChatRepository + Send + Sync>,
        classifier: Arc<dyn ExerciseClassifier>,
    ) -> Self {
        Self { repo, classifier }
    }

    /// Creates a pending recommendation when `text` recommends an exercise.
    pub async fn on_assistant_text(
        &self,
        owner_id: Uuid,
        text: &str,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        let Some(snippet) = self.classifier.detect_recommendation(text) else {
            return Ok(None);
        };

        let recommendation = self
            .repo
            .insert_exercise(owner_id, snippet, Utc::now())
            .await?;

        tracing::info!(
            owner = %owner_id,
            exercise = %recommendation.id,
            "Recorded pending exercise recommendation"
        );
        Ok(Some(recommendation))
    }

    /// Closes the latest pending recommendation when `text` confirms or
    /// declines it. Returns the closed recommendation, if any.
    pub async fn on_user_text(
        &self,
        owner_id: Uuid,
        text: &str,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        let completed = match self.classifier.classify_reply(text) {
            ReplyKind::Confirmed => true,
            ReplyKind::Declined => false,
            ReplyKind::Unrelated => return Ok(None),
        };

        let Some(pending) = self.repo.latest_pending_exercise(owner_id).await? else {
            return Ok(None);
        };

        let closed = self
            .repo
            .close_exercise(pending.id, completed, Utc::now())
            .await?;

        tracing::info!(
            owner = %owner_id,
            exercise = %closed.id,
            completed,
            "Closed exercise recommendation"
        );
        Ok(Some(closed))
    }

    pub async fn has_pending(&self, owner_id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.repo.latest_pending_exercise(owner_id).await?.is_some())
    }

    /// Text of the authoritative pending exercise.
    pub async fn latest_pending(&self, owner_id: Uuid) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .pending_recommendation(owner_id)
            .await?
            .map(|r| r.exercise_text))
    }

    pub async fn pending_recommendation(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        self.repo.latest_pending_exercise(owner_id).await
    }
}
