use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    api::dto::*,
    models::internal::{OwnerContext, Role},
    orchestrator::{SessionError, SessionOrchestrator},
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

#[derive(OpenApi)]
#[openapi(
    paths(chat_history, send_message, usage, pending_exercise, health),
    components(schemas(
        OwnerContext,
        Role,
        ContextRequest,
        SendMessageRequest,
        ChatMessageDto,
        HistoryResponse,
        UsageResponse,
        SendMessageResponse,
        ExerciseDto,
        PendingExerciseResponse,
        ErrorResponse
    ))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>, retryable: bool) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: status.as_u16() as u32,
            retryable,
        }),
    )
}

fn session_error(err: SessionError) -> ApiError {
    let status = match &err {
        SessionError::EmptyMessage => StatusCode::BAD_REQUEST,
        SessionError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        SessionError::QuotaUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Persistence(_) | SessionError::OwnerMismatch { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.user_message(), err.is_retryable())
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/history",
    request_body = ContextRequest,
    responses(
        (status = 200, description = "Stored conversation of the context's owner", body = HistoryResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn chat_history(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let loaded = state
        .orchestrator
        .history_loader
        .load(&req.context)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load history: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "We couldn't load this conversation. Please try again.",
                true,
            )
        })?;

    Ok(Json(HistoryResponse {
        owner_id: req.context.owner_id(),
        messages: loaded.messages.iter().map(ChatMessageDto::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Both messages of the turn", body = SendMessageResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 429, description = "Daily limit reached", body = ErrorResponse),
        (status = 503, description = "Quota check failed", body = ErrorResponse),
        (status = 500, description = "Message could not be stored", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(session_error(SessionError::EmptyMessage));
    }

    let mut view = state
        .orchestrator
        .open_conversation(req.context)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open conversation: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "We couldn't load this conversation. Please try again.",
                true,
            )
        })?;

    let outcome = state
        .orchestrator
        .send_message(&mut view, &req.text)
        .await
        .map_err(session_error)?;

    Ok(Json(SendMessageResponse {
        user_message: ChatMessageDto::from(&outcome.user_message),
        assistant_message: ChatMessageDto::from(&outcome.assistant_message),
        model_failed: outcome.model_failed,
        usage: outcome.usage.map(UsageResponse::from),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/usage",
    request_body = ContextRequest,
    responses(
        (status = 200, description = "Today's message usage", body = UsageResponse),
        (status = 503, description = "Quota check failed", body = ErrorResponse)
    )
)]
pub async fn usage(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<UsageResponse>, ApiError> {
    let usage = state.orchestrator.usage(&req.context).await.map_err(|e| {
        tracing::warn!("Failed to read usage: {}", e);
        session_error(SessionError::QuotaUnavailable(e))
    })?;

    Ok(Json(UsageResponse::from(usage)))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/exercise",
    request_body = ContextRequest,
    responses(
        (status = 200, description = "Latest exercise awaiting follow-up", body = PendingExerciseResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn pending_exercise(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<PendingExerciseResponse>, ApiError> {
    let exercise = state
        .orchestrator
        .pending_exercise(&req.context)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read pending exercise: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "We couldn't load your exercises. Please try again.",
                true,
            )
        })?;

    Ok(Json(PendingExerciseResponse {
        exercise: exercise.map(ExerciseDto::from),
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat/history", post(chat_history))
        .route("/api/v1/chat/messages", post(send_message))
        .route("/api/v1/chat/usage", post(usage))
        .route("/api/v1/chat/exercise", post(pending_exercise))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
