use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::internal::{ExerciseRecommendation, Message, OwnerContext, QuotaUsage, Role};
use crate::orchestrator::ViewMessage;

// ==================== REQUEST DTOs ====================

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ContextRequest {
    pub context: OwnerContext,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SendMessageRequest {
    pub context: OwnerContext,
    pub text: String,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageDto {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// RFC 3339
    pub created_at: String,
    pub pending: bool,
}

impl From<&Message> for ChatMessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at.to_rfc3339(),
            pending: false,
        }
    }
}

impl From<&ViewMessage> for ChatMessageDto {
    fn from(message: &ViewMessage) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at.to_rfc3339(),
            pending: message.pending,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub owner_id: Uuid,
    pub messages: Vec<ChatMessageDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub used: u32,
    pub limit: Option<u32>,
    pub unlimited: bool,
    pub summary: String,
}

impl From<QuotaUsage> for UsageResponse {
    fn from(usage: QuotaUsage) -> Self {
        Self {
            used: usage.used,
            limit: usage.limit,
            unlimited: usage.unlimited,
            summary: usage.summary(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    pub user_message: ChatMessageDto,
    pub assistant_message: ChatMessageDto,
    pub model_failed: bool,
    pub usage: Option<UsageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExerciseDto {
    pub id: Uuid,
    pub exercise_text: String,
    pub recommended_at: String,
}

impl From<ExerciseRecommendation> for ExerciseDto {
    fn from(exercise: ExerciseRecommendation) -> Self {
        Self {
            id: exercise.id,
            exercise_text: exercise.exercise_text,
            recommended_at: exercise.recommended_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingExerciseResponse {
    pub exercise: Option<ExerciseDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
    pub retryable: bool,
}
