use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::*;
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(manager): State<Arc<ConversationManager>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = manager
        .ask(request.session_id, request.message, request.temperature)
        .await?;

    Ok(Json(ChatResponse {
        session_id: outcome.session_id,
        reply: outcome.reply,
        failed: outcome.failed,
        temperature: outcome.temperature,
        turns: outcome.turns,
    }))
}

pub async fn reset_handler(
    State(manager): State<Arc<ConversationManager>>,
    body: Bytes,
) -> Result<Json<ResetResponse>, ApiError> {
    // Body is optional: an empty POST opens a brand-new session
    let request: ResetRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid reset request: {}", e)))?
    };
    let outcome = manager.reset(request.session_id)?;

    info!("Reset requested, new history for {} is empty", outcome.session_id);

    Ok(Json(ResetResponse {
        session_id: outcome.session_id,
        history: outcome.history,
    }))
}

pub async fn history_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let turns = manager.history(&session_id).await?;
    Ok(Json(HistoryResponse { session_id, turns }))
}
