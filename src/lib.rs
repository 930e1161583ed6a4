//! Companion Engine - conversational AI sessions for patient and clinician chats

pub mod api;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::api::routes::{create_router, AppState};
pub use crate::config::Config;
pub use crate::models::internal::{Message, NewMessage, OwnerContext, Role};
pub use crate::orchestrator::{
    ConversationView, PromptSettings, SendOutcome, SessionError, SessionOrchestrator,
};
pub use crate::services::{HttpModelClient, HttpScrubber, ModelClient, Scrubber};
pub use crate::storage::db::init_db;
pub use crate::storage::repository::{ChatRepository, QuotaStore, SeaOrmChatRepository};
