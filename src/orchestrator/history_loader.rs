use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::{HistoryEntry, Message, OwnerContext, Role};
use crate::storage::repository::{ChatRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to load conversation: {0}")]
    Repository(#[from] RepositoryError),
}

/// Stored conversation of one owner, oldest first.
#[derive(Debug, Clone, Default)]
pub struct LoadedConversation {
    pub messages: Vec<Message>,
    pub history: Vec<HistoryEntry>,
}

/// One entry of the caller-visible conversation. `pending` entries were
/// appended optimistically and have not been confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
}

impl From<&Message> for ViewMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
            pending: false,
        }
    }
}

/// What the UI renders: the ordered message list plus the model history,
/// both scoped to the context's owner.
#[derive(Debug, Clone)]
pub struct ConversationView {
    context: OwnerContext,
    messages: Vec<ViewMessage>,
    history: Vec<HistoryEntry>,
}

impl ConversationView {
    pub fn new(context: OwnerContext) -> Self {
        Self {
            context,
            messages: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn from_loaded(context: OwnerContext, loaded: LoadedConversation) -> Self {
        Self {
            context,
            messages: loaded.messages.iter().map(ViewMessage::from).collect(),
            history: loaded.history,
        }
    }

    pub fn context(&self) -> &OwnerContext {
        &self.context
    }

    pub fn owner_id(&self) -> Uuid {
        self.context.owner_id()
    }

    pub fn messages(&self) -> &[ViewMessage] {
        &self.messages
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    /// Appends an unconfirmed entry and returns its local id.
    pub fn push_pending(
        &mut self,
        role: Role,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let content = content.into();
        let id = Uuid::new_v4();
        self.history.push(HistoryEntry::new(role, content.clone()));
        self.messages.push(ViewMessage {
            id,
            role,
            content,
            created_at,
            pending: true,
        });
        id
    }

    /// Marks a pending entry as stored, adopting the stored id and
    /// timestamp. The displayed content is left as the caller typed it.
    pub fn reconcile(&mut self, local_id: Uuid, stored: &Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == local_id) {
            Some(entry) => {
                entry.id = stored.id;
                entry.created_at = stored.created_at;
                entry.pending = false;
                true
            }
            None => false,
        }
    }

    fn replace(&mut self, loaded: LoadedConversation) {
        self.messages = loaded.messages.iter().map(ViewMessage::from).collect();
        self.history = loaded.history;
    }
}

pub struct ChatHistoryLoader {
    repo: Arc<dyn ChatRepository + Send + Sync>,
}

impl ChatHistoryLoader {
    pub fn new(repo: Arc<dyn ChatRepository + Send + Sync>) -> Self {
        Self { repo }
    }

    pub async fn load(&self, context: &OwnerContext) -> Result<LoadedConversation, HistoryError> {
        let owner_id = context.owner_id();
        let messages = self.repo.messages_for_owner(owner_id).await?;
        let history = messages.iter().map(HistoryEntry::from).collect();

        tracing::debug!(owner = %owner_id, count = messages.len(), "Loaded conversation");
        Ok(LoadedConversation { messages, history })
    }

    pub async fn open(&self, context: OwnerContext) -> Result<ConversationView, HistoryError> {
        let loaded = self.load(&context).await?;
        Ok(ConversationView::from_loaded(context, loaded))
    }

    /// Replaces the view with the stored conversation, picking up turns
    /// written elsewhere. Unconfirmed entries are dropped.
    pub async fn resync(&self, view: &mut ConversationView) -> Result<(), HistoryError> {
        let loaded = self.load(view.context()).await?;
        view.replace(loaded);
        Ok(())
    }
}
