pub mod anonymization;
pub mod classifier;
pub mod exercise_tracker;
pub mod history_loader;
pub mod personalization;
pub mod quota_guard;

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::{
    ExerciseRecommendation, Message, NewMessage, OwnerContext, QuotaUsage, Role,
};
use crate::services::model_client::ModelClient;
use crate::services::scrubber_client::Scrubber;
use crate::storage::repository::{ChatRepository, QuotaStore, RepositoryError};

pub use anonymization::AnonymizationFilter;
pub use classifier::{ExerciseClassifier, KeywordClassifier, ReplyKind};
pub use exercise_tracker::ExerciseTracker;
pub use history_loader::{ChatHistoryLoader, ConversationView, HistoryError, LoadedConversation, ViewMessage};
pub use personalization::{ComposeError, ComposedPrompt, PersonalizationComposer};
pub use quota_guard::{QuotaError, QuotaGuard};

pub const DEFAULT_BASE_PROMPT: &str = "You are a warm, supportive mental-health companion. \
You help the person between sessions with their clinician by listening, reflecting, \
and suggesting small practical coping steps. Keep replies short and conversational.";

pub const DEFAULT_TRAINING_PROMPT: &str = "You are a practice partner for a clinician. \
Respond the way a companion would respond to a patient so the clinician can evaluate \
tone and exercise suggestions. Keep replies short and conversational.";

pub const DEFAULT_APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Base prompts and the fixed reply used when the model cannot answer.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub base: String,
    pub training: String,
    pub apology: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_PROMPT.to_string(),
            training: DEFAULT_TRAINING_PROMPT.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
        }
    }
}

impl PromptSettings {
    pub fn base_for(&self, context: &OwnerContext) -> &str {
        if context.is_training() {
            &self.training
        } else {
            &self.base
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    QuotaChecking,
    PersistingUser,
    ScanningUser,
    Composing,
    ModelCalling,
    ScanningAssistant,
    PersistingAssistant,
}

impl SendPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendPhase::Idle => "idle",
            SendPhase::QuotaChecking => "quota_checking",
            SendPhase::PersistingUser => "persisting_user",
            SendPhase::ScanningUser => "scanning_user",
            SendPhase::Composing => "composing",
            SendPhase::ModelCalling => "model_calling",
            SendPhase::ScanningAssistant => "scanning_assistant",
            SendPhase::PersistingAssistant => "persisting_assistant",
        }
    }
}

impl fmt::Display for SendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub user_message: ViewMessage,
    pub assistant_message: ViewMessage,
    /// The assistant message is the apology rather than a model reply.
    pub model_failed: bool,
    /// `None` when usage could not be re-read after the send.
    pub usage: Option<QuotaUsage>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Daily message limit reached")]
    QuotaExceeded { usage: Option<QuotaUsage> },
    #[error("Quota check failed: {0}")]
    QuotaUnavailable(#[from] QuotaError),
    #[error("Failed to persist message: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("Prompt composed for owner {actual} used in conversation of {expected}")]
    OwnerMismatch { expected: Uuid, actual: Uuid },
}

impl SessionError {
    /// Copy safe to show the person typing.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::EmptyMessage => "Please type a message first.".to_string(),
            SessionError::QuotaExceeded { usage: Some(usage) } => format!(
                "You've reached today's message limit ({}). Upgrade your plan for more messages, or come back tomorrow.",
                usage.summary()
            ),
            SessionError::QuotaExceeded { usage: None } => {
                "You've reached today's message limit. Upgrade your plan for more messages, or come back tomorrow.".to_string()
            }
            SessionError::QuotaUnavailable(_) => {
                "We couldn't check your message allowance. Please try again in a moment.".to_string()
            }
            SessionError::Persistence(_) => {
                "Your message couldn't be saved. Please try again.".to_string()
            }
            SessionError::OwnerMismatch { .. } => {
                "Something went wrong loading this conversation. Please reopen it.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::QuotaUnavailable(_) | SessionError::Persistence(_)
        )
    }
}

/// Sequences one outgoing message: quota, persistence, exercise tracking,
/// prompt composition, the model call and the assistant reply.
pub struct SessionOrchestrator {
    repo: Arc<dyn ChatRepository + Send + Sync>,
    model: Arc<dyn ModelClient>,
    prompts: PromptSettings,
    pub quota_guard: QuotaGuard,
    pub anonymizer: AnonymizationFilter,
    pub composer: PersonalizationComposer,
    pub exercise_tracker: ExerciseTracker,
    pub history_loader: ChatHistoryLoader,
}

impl SessionOrchestrator {
    pub fn new(
        repo: Arc<dyn ChatRepository + Send + Sync>,
        quotas: Arc<dyn QuotaStore>,
        model: Arc<dyn ModelClient>,
        scrubber: Arc<dyn Scrubber>,
        prompts: PromptSettings,
    ) -> Self {
        Self {
            repo: repo.clone(),
            model,
            prompts,
            quota_guard: QuotaGuard::new(quotas),
            anonymizer: AnonymizationFilter::new(repo.clone(), scrubber),
            composer: PersonalizationComposer::new(repo.clone()),
            exercise_tracker: ExerciseTracker::new(repo.clone()),
            history_loader: ChatHistoryLoader::new(repo),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ExerciseClassifier>) -> Self {
        self.exercise_tracker = ExerciseTracker::with_classifier(self.repo.clone(), classifier);
        self
    }

    pub fn prompts(&self) -> &PromptSettings {
        &self.prompts
    }

    pub async fn open_conversation(
        &self,
        context: OwnerContext,
    ) -> Result<ConversationView, HistoryError> {
        self.history_loader.open(context).await
    }

    pub async fn resync(&self, view: &mut ConversationView) -> Result<(), HistoryError> {
        self.history_loader.resync(view).await
    }

    pub async fn usage(&self, context: &OwnerContext) -> Result<QuotaUsage, QuotaError> {
        self.quota_guard.current_usage(context.owner_id()).await
    }

    pub async fn pending_exercise(
        &self,
        context: &OwnerContext,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        self.exercise_tracker
            .pending_recommendation(context.owner_id())
            .await
    }

    /// Sends `text` in the conversation held by `view`.
    ///
    /// The user message is appended to `view` flagged pending before it is
    /// stored, and the assistant message is appended after the model call,
    /// including on model failure. If storing either message fails its entry
    /// stays pending and the error is returned.
    #[tracing::instrument(skip_all, fields(owner = %view.owner_id()))]
    pub async fn send_message(
        &self,
        view: &mut ConversationView,
        text: &str,
    ) -> Result<SendOutcome, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let context = *view.context();
        let owner_id = context.owner_id();

        enter(SendPhase::QuotaChecking);
        if !self.quota_guard.may_i_send(owner_id).await? {
            let usage = self.quota_guard.current_usage(owner_id).await.ok();
            enter(SendPhase::Idle);
            return Err(SessionError::QuotaExceeded { usage });
        }

        enter(SendPhase::PersistingUser);
        let user_at = Utc::now();
        let user_local = view.push_pending(Role::User, text, user_at);
        let user_stored = self
            .persist(view, user_local, Role::User, text, user_at)
            .await?;

        enter(SendPhase::ScanningUser);
        if let Err(e) = self.exercise_tracker.on_user_text(owner_id, text).await {
            tracing::warn!("Exercise follow-up tracking failed: {}", e);
        }

        enter(SendPhase::Composing);
        let base_prompt = self.prompts.base_for(&context);
        let prompt = match self.composer.compose(base_prompt, owner_id).await {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!("Personalization unavailable, using base prompt: {}", e);
                ComposedPrompt::bare(base_prompt, owner_id)
            }
        };
        if prompt.owner_id() != owner_id {
            return Err(SessionError::OwnerMismatch {
                expected: owner_id,
                actual: prompt.owner_id(),
            });
        }

        enter(SendPhase::ModelCalling);
        let (reply, model_failed) = match self
            .model
            .invoke(view.history(), prompt.text(), &context)
            .await
        {
            Ok(reply) if !reply.message.trim().is_empty() => (reply.message, false),
            Ok(_) => {
                tracing::warn!("Model returned an empty reply, sending apology");
                (self.prompts.apology.clone(), true)
            }
            Err(e) => {
                tracing::warn!("Model call failed, sending apology: {}", e);
                (self.prompts.apology.clone(), true)
            }
        };

        enter(SendPhase::ScanningAssistant);
        if let Err(e) = self.exercise_tracker.on_assistant_text(owner_id, &reply).await {
            tracing::warn!("Exercise recommendation tracking failed: {}", e);
        }

        enter(SendPhase::PersistingAssistant);
        let assistant_at = Utc::now().max(user_stored.created_at + Duration::milliseconds(1));
        let assistant_local = view.push_pending(Role::Assistant, reply.as_str(), assistant_at);
        let assistant_stored = self
            .persist(view, assistant_local, Role::Assistant, &reply, assistant_at)
            .await?;

        let usage = match self.quota_guard.current_usage(owner_id).await {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::warn!("Could not refresh usage after send: {}", e);
                None
            }
        };

        enter(SendPhase::Idle);
        Ok(SendOutcome {
            user_message: displayed(&user_stored, text),
            assistant_message: displayed(&assistant_stored, &reply),
            model_failed,
            usage,
        })
    }

    /// Stores one message through the anonymization filter and confirms its
    /// pending view entry.
    async fn persist(
        &self,
        view: &mut ConversationView,
        local_id: Uuid,
        role: Role,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message, SessionError> {
        let owner_id = view.owner_id();
        let content = self.anonymizer.scrub(owner_id, text).await;

        let stored = self
            .repo
            .insert_message(NewMessage {
                owner_id,
                role,
                content,
                created_at,
            })
            .await
            .map_err(|e| {
                tracing::error!(role = %role, "Failed to persist message: {}", e);
                SessionError::Persistence(e)
            })?;

        view.reconcile(local_id, &stored);
        Ok(stored)
    }
}

fn enter(phase: SendPhase) {
    tracing::debug!(phase = %phase, "Send phase");
}

/// The stored message as the UI shows it, with the unscrubbed text.
fn displayed(stored: &Message, text: &str) -> ViewMessage {
    ViewMessage {
        content: text.to_string(),
        ..ViewMessage::from(stored)
    }
}
