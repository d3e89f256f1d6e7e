mod memory;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::chat::{ ChatHistory, ChatMessage, ChatSession };

pub use memory::{ AgentStore, MemorySessionStore };

/// Session-scoped conversation storage. Sessions are created lazily on first
/// append; process lifetime only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Appends a message, creating the session (titled from the message) when
    /// it does not exist yet.
    async fn append_message(
        &self,
        session_id: &str,
        message: ChatMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Full history for a session. None when the session is unknown.
    async fn get_history(
        &self,
        session_id: &str
    ) -> Result<Option<ChatHistory>, Box<dyn Error + Send + Sync>>;

    /// All sessions, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<ChatSession>, Box<dyn Error + Send + Sync>>;

    /// Empties the message list but keeps the session record with
    /// message_count reset to 0. False when the session is unknown.
    async fn clear_history(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// Removes the session record and its messages. False when unknown.
    async fn delete_session(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>>;
}

pub fn create_session_store(
    args: &Args
) -> Result<Arc<dyn SessionStore>, Box<dyn Error + Send + Sync>> {
    match args.session_store_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemorySessionStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported session store type: {}", args.session_store_type)
                    )
                )
            ),
    }
}

pub fn initialize_session_store(
    args: &Args
) -> Result<Arc<dyn SessionStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat sessions will be stored in: {}", args.session_store_type);
    create_session_store(args)
}
