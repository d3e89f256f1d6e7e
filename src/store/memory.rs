use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;

use crate::models::agent::{ AgentRecord, AgentStatus, AgentUpdateRequest };
use crate::models::chat::{ title_from_message, ChatHistory, ChatMessage, ChatSession };
use crate::store::SessionStore;

/// In-memory session store. The RwLock serializes writers to the shared maps;
/// no eviction, no persistence.
pub struct MemorySessionStore {
    inner: RwLock<SessionState>,
}

#[derive(Default)]
struct SessionState {
    sessions: HashMap<String, ChatSession>,
    histories: HashMap<String, Vec<ChatMessage>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionState::default()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append_message(
        &self,
        session_id: &str,
        message: ChatMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut state = self.inner.write().await;

        if !state.sessions.contains_key(session_id) {
            let title = title_from_message(&message.content);
            state.sessions.insert(
                session_id.to_string(),
                ChatSession::new(session_id, Some(title))
            );
        }

        let messages = state.histories.entry(session_id.to_string()).or_default();
        messages.push(message);
        let count = messages.len();

        if let Some(session) = state.sessions.get_mut(session_id) {
            session.updated_at = Utc::now();
            session.message_count = count;
        }

        Ok(())
    }

    async fn get_history(
        &self,
        session_id: &str
    ) -> Result<Option<ChatHistory>, Box<dyn Error + Send + Sync>> {
        let state = self.inner.read().await;
        let Some(messages) = state.histories.get(session_id) else {
            return Ok(None);
        };
        let session = state.sessions.get(session_id);
        let now = Utc::now();

        Ok(
            Some(ChatHistory {
                session_id: session_id.to_string(),
                messages: messages.clone(),
                total_messages: messages.len(),
                created_at: session.map(|s| s.created_at).unwrap_or(now),
                updated_at: session.map(|s| s.updated_at).unwrap_or(now),
            })
        )
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, Box<dyn Error + Send + Sync>> {
        let state = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn clear_history(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut state = self.inner.write().await;
        if !state.sessions.contains_key(session_id) {
            return Ok(false);
        }
        state.histories.insert(session_id.to_string(), Vec::new());
        if let Some(session) = state.sessions.get_mut(session_id) {
            session.message_count = 0;
            session.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut state = self.inner.write().await;
        if state.sessions.remove(session_id).is_none() {
            return Ok(false);
        }
        state.histories.remove(session_id);
        Ok(true)
    }
}

/// In-memory registry of local agent records.
pub struct AgentStore {
    agents: RwLock<HashMap<String, AgentRecord>>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, record: AgentRecord) {
        self.agents.write().await.insert(record.agent_id.clone(), record);
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Most recently created first.
    pub async fn list(&self) -> Vec<AgentRecord> {
        let mut records: Vec<AgentRecord> = self.agents.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub async fn update(&self, agent_id: &str, req: &AgentUpdateRequest) -> Option<AgentRecord> {
        let mut agents = self.agents.write().await;
        let record = agents.get_mut(agent_id)?;
        if let Some(config) = &req.config {
            record.config = config.clone();
        }
        if let Some(status) = req.status {
            record.status = status;
        }
        record.updated_at = Utc::now();
        Some(record.clone())
    }

    pub async fn set_status(&self, agent_id: &str, status: AgentStatus) -> Option<AgentRecord> {
        let mut agents = self.agents.write().await;
        let record = agents.get_mut(agent_id)?;
        record.status = status;
        record.updated_at = Utc::now();
        Some(record.clone())
    }

    /// Bumps the invocation counters after a successful invoke.
    pub async fn record_invocation(&self, agent_id: &str) -> Option<AgentRecord> {
        let mut agents = self.agents.write().await;
        let record = agents.get_mut(agent_id)?;
        record.total_messages += 1;
        let now = Utc::now();
        record.last_active = Some(now);
        record.updated_at = now;
        Some(record.clone())
    }

    pub async fn remove(&self, agent_id: &str) -> bool {
        self.agents.write().await.remove(agent_id).is_some()
    }
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::AgentConfig;
    use crate::models::chat::MessageRole;

    fn user_msg(content: &str) -> ChatMessage {
        ChatMessage::new(MessageRole::User, content)
    }

    #[tokio::test]
    async fn history_round_trip_preserves_order() {
        let store = MemorySessionStore::new();
        store.append_message("s1", user_msg("first")).await.unwrap();
        store
            .append_message("s1", ChatMessage::new(MessageRole::Assistant, "reply")).await
            .unwrap();

        let history = store.get_history("s1").await.unwrap().unwrap();
        assert_eq!(history.total_messages, 2);
        assert_eq!(history.messages[0].content, "first");
        assert_eq!(history.messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn session_created_lazily_with_title() {
        let store = MemorySessionStore::new();
        store.append_message("s1", user_msg("hello there")).await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title.as_deref(), Some("hello there"));
        assert_eq!(sessions[0].message_count, 1);
    }

    #[tokio::test]
    async fn clear_keeps_session_and_resets_count() {
        let store = MemorySessionStore::new();
        store.append_message("s1", user_msg("hi")).await.unwrap();

        assert!(store.clear_history("s1").await.unwrap());
        let history = store.get_history("s1").await.unwrap().unwrap();
        assert!(history.messages.is_empty());
        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions[0].message_count, 0);
    }

    #[tokio::test]
    async fn delete_removes_session_and_history() {
        let store = MemorySessionStore::new();
        store.append_message("s1", user_msg("hi")).await.unwrap();

        assert!(store.delete_session("s1").await.unwrap());
        assert!(store.get_history("s1").await.unwrap().is_none());
        assert!(store.list_sessions().await.unwrap().is_empty());
        assert!(!store.delete_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_session_operations_report_missing() {
        let store = MemorySessionStore::new();
        assert!(store.get_history("nope").await.unwrap().is_none());
        assert!(!store.clear_history("nope").await.unwrap());
        assert!(!store.delete_session("nope").await.unwrap());
    }

    #[tokio::test]
    async fn agent_store_update_and_counters() {
        let store = AgentStore::new();
        let record = AgentRecord::new(AgentConfig {
            name: "helper".into(),
            description: None,
            model: "gpt-4".into(),
            temperature: 0.7,
            max_tokens: 1000,
            system_prompt: None,
            capabilities: vec![],
            custom_settings: None,
        });
        let id = record.agent_id.clone();
        store.insert(record).await;

        let updated = store.set_status(&id, AgentStatus::Active).await.unwrap();
        assert_eq!(updated.status, AgentStatus::Active);

        let invoked = store.record_invocation(&id).await.unwrap();
        assert_eq!(invoked.total_messages, 1);
        assert!(invoked.last_active.is_some());

        assert!(store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
    }
}
