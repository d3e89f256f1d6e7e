use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use serde::Serialize;

/// API failure with a stable machine-readable code. Every error body is
/// `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    EmptyMessage,
    AgentInactive(String),
    InvalidAgentType(String),
    SessionNotFound(String),
    AgentNotFound(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::EmptyMessage => "empty_message",
            ApiError::AgentInactive(_) => "agent_inactive",
            ApiError::InvalidAgentType(_) => "invalid_agent_type",
            ApiError::SessionNotFound(_) => "session_not_found",
            ApiError::AgentNotFound(_) => "agent_not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyMessage
            | ApiError::AgentInactive(_)
            | ApiError::InvalidAgentType(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) | ApiError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::EmptyMessage => "Message cannot be empty".to_string(),
            ApiError::AgentInactive(id) => format!("Agent {} is not active", id),
            ApiError::InvalidAgentType(kind) =>
                format!("Invalid agent_type: {}. Use 'orchestrator', 'agent1', or 'agent2'", kind),
            ApiError::SessionNotFound(id) => format!("Session {} not found", id),
            ApiError::AgentNotFound(id) => format!("Agent {} not found", id),
            ApiError::Internal(detail) => detail.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ApiError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(ApiError::EmptyMessage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AgentInactive("a".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidAgentType("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::SessionNotFound("s".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::AgentNotFound("a".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::SessionNotFound("s".into()).code(), "session_not_found");
    }
}
