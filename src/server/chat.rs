use axum::extract::{ Path, State };
use axum::Json;
use chrono::Utc;
use log::info;
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::models::chat::{
    ChatHistory,
    ChatMessage,
    ChatRequest,
    ChatResponse,
    ChatSession,
    MessageRole,
};
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::service::gpt::SentimentResult;

/// POST /api/v1/chat/message
///
/// Stores the user message, runs the agent, stores the reply. The agent
/// call cannot fail; degraded replies flow through with their reason code.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let session_id = request.session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    state.sessions
        .append_message(&session_id, ChatMessage::new(MessageRole::User, &request.message)).await?;

    let history = state.sessions
        .get_history(&session_id).await?
        .map(|h| h.messages)
        .unwrap_or_default();

    let reply = state.agent_service.generate_response(&session_id, &history).await;
    info!(
        "Chat reply for session {} via {} in {:.3}s",
        session_id,
        reply.model_used,
        reply.response_time
    );

    let metadata = serde_json::json!({
        "model_used": reply.model_used,
        "degraded": reply.degraded.map(|d| d.as_str()),
    });
    state.sessions
        .append_message(
            &session_id,
            ChatMessage::with_metadata(MessageRole::Assistant, &reply.content, metadata)
        ).await?;

    Ok(
        Json(ChatResponse {
            message: reply.content,
            session_id,
            timestamp: Utc::now(),
            model_used: reply.model_used,
            tokens_used: Some(reply.tokens_used),
            response_time_ms: Some((reply.response_time * 1000.0) as u64),
            degraded: reply.degraded.map(|d| d.as_str().to_string()),
        })
    )
}

/// GET /api/v1/chat/history/{session_id}
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>
) -> Result<Json<ChatHistory>, ApiError> {
    match state.sessions.get_history(&session_id).await? {
        Some(history) => Ok(Json(history)),
        None => Err(ApiError::SessionNotFound(session_id)),
    }
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<ChatSession>,
    pub total: usize,
}

/// GET /api/v1/chat/sessions
pub async fn list_sessions(
    State(state): State<AppState>
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state.sessions.list_sessions().await?;
    let total = sessions.len();
    Ok(Json(SessionsResponse { sessions, total }))
}

#[derive(Serialize)]
pub struct SessionActionResponse {
    pub session_id: String,
    pub status: &'static str,
}

/// DELETE /api/v1/chat/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>
) -> Result<Json<SessionActionResponse>, ApiError> {
    if !state.sessions.delete_session(&session_id).await? {
        return Err(ApiError::SessionNotFound(session_id));
    }
    Ok(Json(SessionActionResponse { session_id, status: "deleted" }))
}

/// POST /api/v1/chat/sessions/{session_id}/clear
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>
) -> Result<Json<SessionActionResponse>, ApiError> {
    if !state.sessions.clear_history(&session_id).await? {
        return Err(ApiError::SessionNotFound(session_id));
    }
    Ok(Json(SessionActionResponse { session_id, status: "cleared" }))
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub session_id: String,
    pub summary: String,
    pub message_count: usize,
}

/// POST /api/v1/chat/sessions/{session_id}/summary
pub async fn summarize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>
) -> Result<Json<SummaryResponse>, ApiError> {
    let Some(history) = state.sessions.get_history(&session_id).await? else {
        return Err(ApiError::SessionNotFound(session_id));
    };
    let summary = state.gpt.summarize_conversation(&history.messages).await;
    Ok(
        Json(SummaryResponse {
            session_id,
            summary,
            message_count: history.total_messages,
        })
    )
}

#[derive(Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

/// POST /api/v1/chat/sentiment
pub async fn analyze_sentiment(
    State(state): State<AppState>,
    Json(request): Json<SentimentRequest>
) -> Result<Json<SentimentResult>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    Ok(Json(state.gpt.analyze_sentiment(&request.text).await))
}
