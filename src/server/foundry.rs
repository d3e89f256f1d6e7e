use axum::extract::{ Path, State };
use axum::Json;
use chrono::Utc;
use chrono::DateTime;
use serde::{ Deserialize, Serialize };

use crate::models::chat::ChatMessage;
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::service::orchestrator::{ AgentKind, OrchestratorReply, OrchestratorStatus };

#[derive(Deserialize)]
pub struct FoundryChatRequest {
    pub message: String,
    /// Which agent handles the message; defaults to the orchestrator.
    #[serde(default)]
    pub agent_type: Option<String>,
}

#[derive(Serialize)]
pub struct FoundryChatResponse {
    pub response: String,
    pub agent_used: String,
    pub model_used: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<OrchestratorReply> for FoundryChatResponse {
    fn from(reply: OrchestratorReply) -> Self {
        Self {
            response: reply.content,
            agent_used: reply.agent_used.name().to_string(),
            model_used: "foundry-agents",
            thread_id: reply.thread_id,
            run_id: reply.run_id,
            response_time_ms: (reply.response_time * 1000.0) as u64,
            degraded: reply.degraded.map(|d| d.as_str().to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// POST /api/v1/chat/foundry/chat and /api/v1/chat/foundry/orchestrator
pub async fn orchestrator_chat(
    State(state): State<AppState>,
    Json(request): Json<FoundryChatRequest>
) -> Result<Json<FoundryChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let kind_name = request.agent_type.as_deref().unwrap_or("orchestrator");
    let Some(kind) = AgentKind::parse(kind_name) else {
        return Err(ApiError::InvalidAgentType(kind_name.to_string()));
    };
    let reply = match kind {
        AgentKind::Orchestrator => state.orchestrator.process_message(&request.message).await,
        specialist => state.orchestrator.route_to(specialist, &request.message).await,
    };
    Ok(Json(reply.into()))
}

/// POST /api/v1/chat/foundry/agent1
pub async fn agent1_chat(
    State(state): State<AppState>,
    Json(request): Json<FoundryChatRequest>
) -> Result<Json<FoundryChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let reply = state.orchestrator.route_to(AgentKind::Agent1, &request.message).await;
    Ok(Json(reply.into()))
}

/// POST /api/v1/chat/foundry/agent2
pub async fn agent2_chat(
    State(state): State<AppState>,
    Json(request): Json<FoundryChatRequest>
) -> Result<Json<FoundryChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let reply = state.orchestrator.route_to(AgentKind::Agent2, &request.message).await;
    Ok(Json(reply.into()))
}

/// GET /api/v1/chat/foundry/status
pub async fn status(
    State(state): State<AppState>
) -> Result<Json<OrchestratorStatus>, ApiError> {
    Ok(Json(state.orchestrator.get_status().await))
}

#[derive(Serialize)]
pub struct ThreadHistoryResponse {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    pub total_messages: usize,
}

/// GET /api/v1/chat/foundry/history/{thread_id}
///
/// 404 only when the remote API says the thread does not exist;
/// transport and configuration failures surface as 500.
pub async fn thread_history(
    State(state): State<AppState>,
    Path(thread_id): Path<String>
) -> Result<Json<ThreadHistoryResponse>, ApiError> {
    let messages = state.orchestrator
        .thread_history(&thread_id).await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::SessionNotFound(thread_id.clone())
            } else {
                ApiError::Internal(e.to_string())
            }
        })?;
    let total_messages = messages.len();
    Ok(Json(ThreadHistoryResponse { thread_id, messages, total_messages }))
}

#[derive(Serialize)]
pub struct NewSessionResponse {
    pub thread_id: String,
    pub status: &'static str,
}

/// POST /api/v1/chat/foundry/new-session
pub async fn new_session(
    State(state): State<AppState>
) -> Result<Json<NewSessionResponse>, ApiError> {
    let thread_id = state.orchestrator
        .new_session().await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(NewSessionResponse { thread_id, status: "created" }))
}

#[derive(Serialize)]
pub struct FoundryHealthResponse {
    pub status: &'static str,
    pub service_available: bool,
}

/// GET /api/v1/chat/foundry/health
pub async fn health(
    State(state): State<AppState>
) -> Result<Json<FoundryHealthResponse>, ApiError> {
    let available = state.orchestrator.is_available().await;
    Ok(
        Json(FoundryHealthResponse {
            status: if available {
                "healthy"
            } else {
                "degraded"
            },
            service_available: available,
        })
    )
}
