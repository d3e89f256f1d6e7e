use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;

/// Remote agent resource as returned by the managed-agent API.
#[derive(Deserialize, Debug, Clone)]
pub struct AgentResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ThreadResource {
    pub id: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MessageResource {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl MessageResource {
    /// Joins all text segments of the message, newline separated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.text.as_ref().map(|t| t.value.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TextContent {
    pub value: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MessageList {
    pub data: Vec<MessageResource>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelling,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// Terminal states stop the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RunResource {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VectorStoreResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileResource {
    pub id: String,
}

#[derive(Serialize, Debug)]
pub struct CreateAgentRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<JsonValue>,
}

#[derive(Serialize, Debug)]
pub struct CreateMessageRequest {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

#[derive(Serialize, Debug)]
pub struct CreateVectorStoreRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<JsonValue>,
}

#[derive(Serialize, Debug)]
pub struct AttachFileRequest {
    pub file_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_snake_case() {
        let run: RunResource = serde_json
            ::from_str(r#"{"id":"run_1","status":"in_progress"}"#)
            .unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(!run.status.is_terminal());

        let run: RunResource = serde_json
            ::from_str(r#"{"id":"run_2","status":"failed","last_error":{"code":"server_error","message":"boom"}}"#)
            .unwrap();
        assert!(run.status.is_terminal());
        assert_eq!(run.last_error.unwrap().code.as_deref(), Some("server_error"));
    }

    #[test]
    fn message_text_joins_segments() {
        let msg: MessageResource = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": {"value": "first"}},
                    {"type": "image_file"},
                    {"type": "text", "text": {"value": "second"}}
                ]
            }"#
        ).unwrap();
        assert_eq!(msg.text(), "first\nsecond");
    }
}
