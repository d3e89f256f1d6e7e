use axum::extract::{ Path, State };
use axum::Json;
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::time::Instant;

use crate::models::agent::{
    AgentCapability,
    AgentCreateRequest,
    AgentInvokeRequest,
    AgentInvokeResponse,
    AgentMetrics,
    AgentRecord,
    AgentStatus,
    AgentUpdateRequest,
};
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::tools::search::format_results;

/// POST /api/v1/agent/create
pub async fn create_agent(
    State(state): State<AppState>,
    Json(request): Json<AgentCreateRequest>
) -> Result<Json<AgentRecord>, ApiError> {
    let mut record = AgentRecord::new(request.config);
    if request.auto_activate {
        record.status = AgentStatus::Active;
    }
    info!("Created agent {} ({})", record.agent_id, record.config.name);
    state.agents.insert(record.clone()).await;
    Ok(Json(record))
}

#[derive(Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<AgentRecord>,
    pub total: usize,
}

/// GET /api/v1/agent
pub async fn list_agents(
    State(state): State<AppState>
) -> Result<Json<AgentListResponse>, ApiError> {
    let agents = state.agents.list().await;
    let total = agents.len();
    Ok(Json(AgentListResponse { agents, total }))
}

/// GET /api/v1/agent/{agent_id}
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentRecord>, ApiError> {
    state.agents
        .get(&agent_id).await
        .map(Json)
        .ok_or(ApiError::AgentNotFound(agent_id))
}

/// PUT /api/v1/agent/{agent_id}
pub async fn update_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<AgentUpdateRequest>
) -> Result<Json<AgentRecord>, ApiError> {
    state.agents
        .update(&agent_id, &request).await
        .map(Json)
        .ok_or(ApiError::AgentNotFound(agent_id))
}

#[derive(Serialize)]
pub struct AgentActionResponse {
    pub agent_id: String,
    pub status: &'static str,
}

/// DELETE /api/v1/agent/{agent_id}
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentActionResponse>, ApiError> {
    if !state.agents.remove(&agent_id).await {
        return Err(ApiError::AgentNotFound(agent_id));
    }
    Ok(Json(AgentActionResponse { agent_id, status: "deleted" }))
}

/// POST /api/v1/agent/{agent_id}/invoke
///
/// Runs the agent's configured prompt through the chat-completions client.
/// Only active agents accept invocations.
pub async fn invoke_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<AgentInvokeRequest>
) -> Result<Json<AgentInvokeResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let Some(record) = state.agents.get(&agent_id).await else {
        return Err(ApiError::AgentNotFound(agent_id));
    };
    if record.status != AgentStatus::Active {
        return Err(ApiError::AgentInactive(agent_id));
    }

    let start = Instant::now();
    let mut system_prompt = record.config.system_prompt
        .clone()
        .unwrap_or_else(|| "You are a helpful assistant.".to_string());

    // Web-search-capable agents get fresh results folded into their prompt.
    let search_used = record.config.capabilities.contains(&AgentCapability::WebSearch);
    if search_used {
        let results = state.search.search(&request.message, 3).await;
        system_prompt = format!("{}\n\nWeb search results:\n{}", system_prompt, format_results(&results));
    }

    let reply = state.gpt
        .generate_chat_response(
            &request.message,
            &[],
            &system_prompt,
            record.config.temperature,
            record.config.max_tokens
        ).await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    state.agents.record_invocation(&agent_id).await;

    Ok(
        Json(AgentInvokeResponse {
            agent_id,
            response: reply.content,
            metadata: Some(
                serde_json::json!({
                "model_used": reply.model_used,
                "tokens_used": reply.tokens_used,
                "search_used": search_used,
            })
            ),
            processing_time_ms: Some(start.elapsed().as_millis() as u64),
            timestamp: Utc::now(),
        })
    )
}

/// GET /api/v1/agent/{agent_id}/metrics
///
/// Message counters are real; rates and latency figures are placeholders
/// until per-invocation accounting exists.
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentMetrics>, ApiError> {
    let Some(record) = state.agents.get(&agent_id).await else {
        return Err(ApiError::AgentNotFound(agent_id));
    };
    Ok(
        Json(AgentMetrics {
            agent_id: record.agent_id,
            total_sessions: record.session_count,
            total_messages: record.total_messages,
            average_response_time_ms: 0.0,
            success_rate: 1.0,
            last_24h_messages: record.total_messages,
            uptime_percentage: 100.0,
        })
    )
}

/// POST /api/v1/agent/{agent_id}/activate
pub async fn activate_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentRecord>, ApiError> {
    state.agents
        .set_status(&agent_id, AgentStatus::Active).await
        .map(Json)
        .ok_or(ApiError::AgentNotFound(agent_id))
}

/// POST /api/v1/agent/{agent_id}/deactivate
pub async fn deactivate_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentRecord>, ApiError> {
    state.agents
        .set_status(&agent_id, AgentStatus::Inactive).await
        .map(Json)
        .ok_or(ApiError::AgentNotFound(agent_id))
}

#[derive(Serialize)]
pub struct AgentStatusResponse {
    pub agent_id: String,
    pub status: AgentStatus,
    pub is_active: bool,
}

/// GET /api/v1/agent/{agent_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(agent_id): Path<String>
) -> Result<Json<AgentStatusResponse>, ApiError> {
    let Some(record) = state.agents.get(&agent_id).await else {
        return Err(ApiError::AgentNotFound(agent_id));
    };
    Ok(
        Json(AgentStatusResponse {
            agent_id: record.agent_id,
            is_active: record.status == AgentStatus::Active,
            status: record.status,
        })
    )
}
