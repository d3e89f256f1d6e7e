use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Initializing,
    Active,
    Inactive,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCapability {
    Chat,
    Analysis,
    Generation,
    Summarization,
    Translation,
    #[serde(rename = "web_search")]
    WebSearch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<AgentCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_settings: Option<JsonValue>,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_capabilities() -> Vec<AgentCapability> {
    vec![AgentCapability::Chat]
}

/// Local registry record. This is the canonical "agent" the CRUD endpoints
/// operate on; remote Foundry agents are configuration, surfaced read-only
/// through the foundry status endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub config: AgentConfig,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    pub session_count: u64,
    pub total_messages: u64,
}

impl AgentRecord {
    pub fn new(config: AgentConfig) -> Self {
        let now = Utc::now();
        Self {
            agent_id: format!("agent_{}", &Uuid::new_v4().simple().to_string()[..8]),
            config,
            status: AgentStatus::Initializing,
            created_at: now,
            updated_at: now,
            last_active: None,
            session_count: 0,
            total_messages: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AgentCreateRequest {
    pub config: AgentConfig,
    #[serde(default = "default_auto_activate")]
    pub auto_activate: bool,
}

fn default_auto_activate() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct AgentUpdateRequest {
    pub config: Option<AgentConfig>,
    pub status: Option<AgentStatus>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AgentInvokeRequest {
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentInvokeResponse {
    pub agent_id: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub average_response_time_ms: f64,
    pub success_rate: f64,
    pub last_24h_messages: u64,
    pub uptime_percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_starts_initializing_with_short_id() {
        let record = AgentRecord::new(AgentConfig {
            name: "test".into(),
            description: None,
            model: default_model(),
            temperature: 0.7,
            max_tokens: 1000,
            system_prompt: None,
            capabilities: default_capabilities(),
            custom_settings: None,
        });
        assert_eq!(record.status, AgentStatus::Initializing);
        assert!(record.agent_id.starts_with("agent_"));
        assert_eq!(record.agent_id.len(), "agent_".len() + 8);
    }

    #[test]
    fn create_request_defaults_apply() {
        let req: AgentCreateRequest = serde_json
            ::from_str(r#"{"config":{"name":"helper"}}"#)
            .unwrap();
        assert!(req.auto_activate);
        assert_eq!(req.config.model, "gpt-4");
        assert_eq!(req.config.max_tokens, 1000);
        assert_eq!(req.config.capabilities, vec![AgentCapability::Chat]);
    }

    #[test]
    fn status_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&AgentStatus::Active).unwrap(), "\"active\"");
        let status: AgentStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(status, AgentStatus::Inactive);
    }
}
