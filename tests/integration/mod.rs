// tests/integration/mod.rs

// ============================================
// Re-export commonly used types
// ============================================
pub use std::sync::Arc;
pub use uuid::Uuid;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use companion_engine::{
    api::routes::{create_router, AppState},
    models::internal::{
        ExerciseRecommendation, HistoryEntry, Message, NewMessage, OwnerContext,
        PersonalizationProfile, Role,
    },
    orchestrator::{PromptSettings, SessionOrchestrator},
    services::{ModelClient, ModelError, ModelReply, ScrubError, Scrubber},
    storage::{init_db, ChatRepository, RepositoryError, SeaOrmChatRepository},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub mod session;

// ============================================
// Shared Test Helpers
// ============================================

pub async fn create_test_repo() -> Arc<SeaOrmChatRepository> {
    let db = init_db("sqlite::memory:").await.unwrap();
    Arc::new(SeaOrmChatRepository::new(db))
}

pub fn patient(patient_id: Uuid) -> OwnerContext {
    OwnerContext::Patient { patient_id }
}

/// One recorded model invocation.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub history: Vec<HistoryEntry>,
    pub system_prompt: String,
    pub context: OwnerContext,
    /// User messages already in the store when the model was called.
    pub stored_user_messages: usize,
}

/// Scripted model that records every call and what the store held at the time.
pub struct FakeModel {
    repo: Arc<SeaOrmChatRepository>,
    reply: Mutex<Option<String>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl FakeModel {
    pub fn replying(repo: Arc<SeaOrmChatRepository>, text: &str) -> Arc<Self> {
        Arc::new(Self {
            repo,
            reply: Mutex::new(Some(text.to_string())),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(repo: Arc<SeaOrmChatRepository>) -> Arc<Self> {
        Arc::new(Self {
            repo,
            reply: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reply(&self, text: &str) {
        *self.reply.lock().unwrap() = Some(text.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<ModelCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelClient for FakeModel {
    async fn invoke(
        &self,
        history: &[HistoryEntry],
        system_prompt: &str,
        context: &OwnerContext,
    ) -> Result<ModelReply, ModelError> {
        let stored_user_messages = self
            .repo
            .messages_for_owner(context.owner_id())
            .await
            .map(|messages| messages.iter().filter(|m| m.role == Role::User).count())
            .unwrap_or(0);

        self.calls.lock().unwrap().push(ModelCall {
            history: history.to_vec(),
            system_prompt: system_prompt.to_string(),
            context: *context,
            stored_user_messages,
        });

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Some(message) => Ok(ModelReply { message }),
            None => Err(ModelError::ApiError {
                status: 503,
                message: "model offline".to_string(),
            }),
        }
    }
}

/// Replaces the name "Dana" with a placeholder, or fails when told to.
#[derive(Default)]
pub struct FakeScrubber {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    rewrites: Mutex<Vec<(String, String)>>,
}

impl FakeScrubber {
    /// Also replace `from` with `to` in every scrubbed text.
    pub fn rewrite(&self, from: &str, to: &str) {
        self.rewrites
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string()));
    }
}

#[async_trait]
impl Scrubber for FakeScrubber {
    async fn scrub(&self, text: &str) -> Result<String, ScrubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScrubError::ApiError {
                status: 500,
                message: "scrubber down".to_string(),
            });
        }
        let mut scrubbed = text.replace("Dana", "[NAME]");
        for (from, to) in self.rewrites.lock().unwrap().iter() {
            scrubbed = scrubbed.replace(from.as_str(), to);
        }
        Ok(scrubbed)
    }
}

/// Repository that refuses to store messages of one role.
pub struct FailingInserts {
    pub inner: Arc<SeaOrmChatRepository>,
    pub fail_role: Role,
}

#[async_trait]
impl ChatRepository for FailingInserts {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        if message.role == self.fail_role {
            return Err(RepositoryError::DbError(sea_orm::DbErr::Custom(
                "disk I/O error".to_string(),
            )));
        }
        self.inner.insert_message(message).await
    }

    async fn messages_for_owner(&self, owner_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        self.inner.messages_for_owner(owner_id).await
    }

    async fn count_messages(&self, owner_id: Uuid) -> Result<u64, RepositoryError> {
        self.inner.count_messages(owner_id).await
    }

    async fn insert_exercise(
        &self,
        owner_id: Uuid,
        exercise_text: String,
        recommended_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError> {
        self.inner
            .insert_exercise(owner_id, exercise_text, recommended_at)
            .await
    }

    async fn latest_pending_exercise(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        self.inner.latest_pending_exercise(owner_id).await
    }

    async fn close_exercise(
        &self,
        id: Uuid,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError> {
        self.inner.close_exercise(id, completed, completed_at).await
    }

    async fn exercises_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<ExerciseRecommendation>, RepositoryError> {
        self.inner.exercises_for_owner(owner_id).await
    }

    async fn find_profile(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<PersonalizationProfile>, RepositoryError> {
        self.inner.find_profile(owner_id).await
    }

    async fn upsert_profile(&self, profile: PersonalizationProfile) -> Result<(), RepositoryError> {
        self.inner.upsert_profile(profile).await
    }

    async fn anonymization_enabled(&self, owner_id: Uuid) -> Result<Option<bool>, RepositoryError> {
        self.inner.anonymization_enabled(owner_id).await
    }

    async fn set_anonymization(&self, owner_id: Uuid, enabled: bool) -> Result<(), RepositoryError> {
        self.inner.set_anonymization(owner_id, enabled).await
    }
}

/// Engine wired to an in-memory database and scripted collaborators.
pub struct Harness {
    pub repo: Arc<SeaOrmChatRepository>,
    pub model: Arc<FakeModel>,
    pub scrubber: Arc<FakeScrubber>,
    pub orchestrator: Arc<SessionOrchestrator>,
}

pub async fn create_harness(reply: &str) -> Harness {
    let repo = create_test_repo().await;
    let model = FakeModel::replying(repo.clone(), reply);
    harness_from(repo.clone(), repo, model)
}

pub async fn create_failing_model_harness() -> Harness {
    let repo = create_test_repo().await;
    let model = FakeModel::failing(repo.clone());
    harness_from(repo.clone(), repo, model)
}

pub fn harness_from(
    repo: Arc<SeaOrmChatRepository>,
    chat: Arc<dyn ChatRepository + Send + Sync>,
    model: Arc<FakeModel>,
) -> Harness {
    let scrubber = Arc::new(FakeScrubber::default());
    let orchestrator = Arc::new(SessionOrchestrator::new(
        chat,
        repo.clone(),
        model.clone(),
        scrubber.clone(),
        PromptSettings::default(),
    ));

    Harness {
        repo,
        model,
        scrubber,
        orchestrator,
    }
}

pub async fn create_test_app(reply: &str) -> (Router, Harness) {
    let harness = create_harness(reply).await;
    let state = AppState {
        orchestrator: harness.orchestrator.clone(),
    };

    (create_router(state), harness)
}
