pub mod gpt;
pub mod orchestrator;

use log::{ error, info, warn };
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{ Duration, Instant };
use tokio::sync::Mutex;

use crate::cli::Args;
use crate::foundry::wire::{ AgentResource, CreateAgentRequest, RunStatus, VectorStoreResource };
use crate::foundry::FoundryClient;
use crate::models::chat::ChatMessage;

/// Placeholder figure: the runs API does not expose token usage.
const TOKEN_ESTIMATE: u32 = 100;
const MOCK_TOKEN_ESTIMATE: u32 = 50;

/// Iterations spent waiting for a previous run on the same thread to settle
/// before posting a new message.
const SETTLE_MAX_ITERATIONS: u32 = 10;

/// Why a reply is synthetic instead of genuine model output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Degradation {
    NoClient,
    InitFailed,
    Timeout,
    RunFailed,
    NoResponse,
    Upstream,
}

impl Degradation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Degradation::NoClient => "no_client",
            Degradation::InitFailed => "init_failed",
            Degradation::Timeout => "timeout",
            Degradation::RunFailed => "run_failed",
            Degradation::NoResponse => "no_response",
            Degradation::Upstream => "upstream_error",
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a generate call. Always produced; failures surface as a
/// degraded reply, never as an error.
#[derive(Clone, Debug)]
pub struct AgentReply {
    pub content: String,
    pub model_used: String,
    pub tokens_used: u32,
    pub response_time: f64,
    pub degraded: Option<Degradation>,
}

#[derive(Clone, Debug)]
pub struct AgentServiceConfig {
    pub model_deployment: String,
    pub fixed_agent_id: Option<String>,
    pub instructions: String,
    pub knowledge_dir: String,
    pub grounding_connection_id: Option<String>,
    pub max_poll_iterations: u32,
}

impl AgentServiceConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            model_deployment: args.model_deployment.clone(),
            fixed_agent_id: args.foundry_agent_id.clone(),
            instructions: args.agent_instructions.clone(),
            knowledge_dir: args.knowledge_dir.clone(),
            grounding_connection_id: args.grounding_connection_id.clone(),
            max_poll_iterations: args.run_poll_max_iterations,
        }
    }
}

struct SessionThread {
    thread_id: String,
    last_run_id: Option<String>,
}

/// Wraps the managed-agent API behind a single generate operation:
/// create-or-reuse agent, per-session thread, post message, create run, poll
/// until terminal, fetch the reply. Every failure path degrades to a
/// synthetic reply so the HTTP layer always has something to return.
pub struct AgentService {
    client: Option<FoundryClient>,
    config: AgentServiceConfig,
    agent: Mutex<Option<AgentResource>>,
    vector_store: Mutex<Option<VectorStoreResource>>,
    threads: Mutex<HashMap<String, SessionThread>>,
    /// Set when this service created the remote agent (and should delete it).
    owns_agent: Mutex<bool>,
}

impl AgentService {
    pub fn new(client: Option<FoundryClient>, config: AgentServiceConfig) -> Self {
        if client.is_none() {
            warn!("No agent service client configured, responses will use mock mode");
        }
        Self {
            client,
            config,
            agent: Mutex::new(None),
            vector_store: Mutex::new(None),
            threads: Mutex::new(HashMap::new()),
            owns_agent: Mutex::new(false),
        }
    }

    pub fn from_args(args: &Args) -> Self {
        let client = if args.foundry_configured() {
            match FoundryClient::from_args(args) {
                Ok(client) => Some(client),
                Err(e) => {
                    error!("Failed to build agent service client: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self::new(client, AgentServiceConfig::from_args(args))
    }

    /// Generates a reply for the newest user message in `history`, scoped to
    /// `session_id`. Never returns an error: every failure collapses into a
    /// degraded reply with a structured reason code.
    pub async fn generate_response(
        &self,
        session_id: &str,
        history: &[ChatMessage]
    ) -> AgentReply {
        let Some(client) = &self.client else {
            return Self::mock_reply();
        };

        let user_message = history
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("Hello");

        let start = Instant::now();
        match self.run_conversation_turn(client, session_id, user_message, start).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Agent service call failed, falling back: {}", e);
                AgentReply {
                    content: "This is a fallback response due to an error in the agent service.".to_string(),
                    model_used: "fallback".to_string(),
                    tokens_used: MOCK_TOKEN_ESTIMATE,
                    response_time: start.elapsed().as_secs_f64(),
                    degraded: Some(Degradation::Upstream),
                }
            }
        }
    }

    async fn run_conversation_turn(
        &self,
        client: &FoundryClient,
        session_id: &str,
        user_message: &str,
        start: Instant
    ) -> Result<AgentReply, Box<dyn Error + Send + Sync>> {
        let Some(agent_id) = self.ensure_agent(client).await else {
            return Ok(AgentReply {
                content: "Failed to initialize agent or thread.".to_string(),
                model_used: "error".to_string(),
                tokens_used: 0,
                response_time: start.elapsed().as_secs_f64(),
                degraded: Some(Degradation::InitFailed),
            });
        };

        let thread_id = self.ensure_thread(client, session_id).await?;
        self.wait_for_previous_run(client, session_id, &thread_id).await;

        info!("Creating message in thread {}", thread_id);
        client.create_message(&thread_id, user_message).await?;

        info!("Creating run for agent {}", agent_id);
        let mut run = client.create_run(&thread_id, &agent_id).await?;
        self.remember_run(session_id, &run.id).await;

        let mut iteration: u32 = 0;
        while !run.status.is_terminal() && iteration < self.config.max_poll_iterations {
            tokio::time::sleep(poll_delay(iteration)).await;
            iteration += 1;
            match client.get_run(&thread_id, &run.id).await {
                Ok(updated) => {
                    info!("Run {} status: {:?} (iteration {})", run.id, updated.status, iteration);
                    run = updated;
                }
                Err(e) => {
                    error!("Error getting run status: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        if !run.status.is_terminal() {
            warn!("Run {} timed out after {} iterations", run.id, iteration);
            return Ok(AgentReply {
                content: "Timeout: the request took too long. Please try a simpler question.".to_string(),
                model_used: self.config.model_deployment.clone(),
                tokens_used: 0,
                response_time: start.elapsed().as_secs_f64(),
                degraded: Some(Degradation::Timeout),
            });
        }

        match run.status {
            RunStatus::Completed => {
                let Some(message) = client.last_assistant_message(&thread_id).await? else {
                    warn!("No response message found in thread {}", thread_id);
                    return Ok(AgentReply {
                        content: "No response received from the agent.".to_string(),
                        model_used: self.config.model_deployment.clone(),
                        tokens_used: 0,
                        response_time: start.elapsed().as_secs_f64(),
                        degraded: Some(Degradation::NoResponse),
                    });
                };

                Ok(AgentReply {
                    content: message.text(),
                    model_used: self.config.model_deployment.clone(),
                    tokens_used: TOKEN_ESTIMATE,
                    response_time: start.elapsed().as_secs_f64(),
                    degraded: None,
                })
            }
            status => {
                if let Some(err) = &run.last_error {
                    error!(
                        "Run {} ended with status {:?}: {} ({})",
                        run.id,
                        status,
                        err.message.as_deref().unwrap_or("unknown error"),
                        err.code.as_deref().unwrap_or("no code")
                    );
                } else {
                    error!("Run {} ended with status {:?}", run.id, status);
                }
                Ok(AgentReply {
                    content: "Sorry, there was an error processing your request.".to_string(),
                    model_used: self.config.model_deployment.clone(),
                    tokens_used: 0,
                    response_time: start.elapsed().as_secs_f64(),
                    degraded: Some(Degradation::RunFailed),
                })
            }
        }
    }

    fn mock_reply() -> AgentReply {
        AgentReply {
            content: "This is a mock response since the agent service is not available.".to_string(),
            model_used: "mock-model".to_string(),
            tokens_used: MOCK_TOKEN_ESTIMATE,
            response_time: 0.1,
            degraded: Some(Degradation::NoClient),
        }
    }

    /// Returns the remote agent id, binding a pre-provisioned agent or
    /// creating a fresh one on first use. None when initialization fails.
    async fn ensure_agent(&self, client: &FoundryClient) -> Option<String> {
        let mut agent = self.agent.lock().await;
        if let Some(existing) = agent.as_ref() {
            return Some(existing.id.clone());
        }

        if let Some(fixed_id) = &self.config.fixed_agent_id {
            match client.get_agent(fixed_id).await {
                Ok(remote) => {
                    info!("Using existing agent: {}", remote.id);
                    let id = remote.id.clone();
                    *agent = Some(remote);
                    return Some(id);
                }
                Err(e) => {
                    warn!("Failed to retrieve existing agent {}: {}. Creating a new one.", fixed_id, e);
                }
            }
        }

        let mut tools = Vec::new();
        if let Some(connection_id) = &self.config.grounding_connection_id {
            info!("Adding grounding tool with connection: {}", connection_id);
            tools.push(
                serde_json::json!({
                    "type": "bing_grounding",
                    "bing_grounding": { "connections": [{ "connection_id": connection_id }] }
                })
            );
        }
        let tool_resources = self.ensure_vector_store(client).await.map(|store| {
            serde_json::json!({ "file_search": { "vector_store_ids": [store.id] } })
        });
        if tool_resources.is_some() {
            tools.push(serde_json::json!({ "type": "file_search" }));
        }

        let request = CreateAgentRequest {
            model: self.config.model_deployment.clone(),
            name: "foundry-agent backend assistant".to_string(),
            instructions: self.config.instructions.clone(),
            temperature: Some(0.1),
            tools,
            tool_resources,
        };

        match client.create_agent(&request).await {
            Ok(remote) => {
                let id = remote.id.clone();
                *agent = Some(remote);
                *self.owns_agent.lock().await = true;
                Some(id)
            }
            Err(e) => {
                error!("Failed to create agent: {}", e);
                None
            }
        }
    }

    /// Creates the knowledge-base vector store once and uploads the JSON
    /// files from the configured directory. Best effort: a missing directory
    /// or failed upload downgrades to an agent without file search.
    async fn ensure_vector_store(&self, client: &FoundryClient) -> Option<VectorStoreResource> {
        if self.config.knowledge_dir.is_empty() {
            return None;
        }

        let mut cached = self.vector_store.lock().await;
        if let Some(store) = cached.as_ref() {
            return Some(store.clone());
        }

        let dir = Path::new(&self.config.knowledge_dir);
        if !dir.is_dir() {
            warn!("Knowledge directory not found: {}", self.config.knowledge_dir);
            return None;
        }

        let store = match client.create_vector_store("backend-knowledge-base").await {
            Ok(store) => store,
            Err(e) => {
                error!("Vector store setup failed: {}", e);
                return None;
            }
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read knowledge directory: {}", e);
                return None;
            }
        };

        let mut uploaded = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Failed to read {}: {}", path.display(), e);
                    continue;
                }
            };
            match client.upload_file(&name, bytes).await {
                Ok(file) => {
                    if let Err(e) = client.attach_file(&store.id, &file.id).await {
                        error!("Failed to attach {} to vector store: {}", name, e);
                    } else {
                        uploaded += 1;
                        info!("Uploaded {} -> file {}", name, file.id);
                    }
                }
                Err(e) => error!("Failed to upload {}: {}", name, e),
            }
        }
        info!("Vector store {} ready with {} files", store.id, uploaded);

        *cached = Some(store.clone());
        Some(store)
    }

    async fn ensure_thread(
        &self,
        client: &FoundryClient,
        session_id: &str
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut threads = self.threads.lock().await;
        if let Some(existing) = threads.get(session_id) {
            return Ok(existing.thread_id.clone());
        }
        let thread = client.create_thread().await?;
        threads.insert(session_id.to_string(), SessionThread {
            thread_id: thread.id.clone(),
            last_run_id: None,
        });
        Ok(thread.id)
    }

    async fn remember_run(&self, session_id: &str, run_id: &str) {
        let mut threads = self.threads.lock().await;
        if let Some(session) = threads.get_mut(session_id) {
            session.last_run_id = Some(run_id.to_string());
        }
    }

    /// Posting onto a thread with an in-flight run is rejected by the remote
    /// API, so wait (bounded) for the previous run to settle.
    async fn wait_for_previous_run(
        &self,
        client: &FoundryClient,
        session_id: &str,
        thread_id: &str
    ) {
        let last_run_id = {
            let threads = self.threads.lock().await;
            threads.get(session_id).and_then(|s| s.last_run_id.clone())
        };
        let Some(run_id) = last_run_id else {
            return;
        };

        for _ in 0..SETTLE_MAX_ITERATIONS {
            match client.get_run(thread_id, &run_id).await {
                Ok(run) if run.status.is_terminal() => {
                    return;
                }
                Ok(_) => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => {
                    warn!("Could not check previous run {}: {}", run_id, e);
                    return;
                }
            }
        }
        warn!("Previous run {} still active after settle wait, posting anyway", run_id);
    }

    /// Best-effort deletion of the remote agent this service created.
    /// Pre-provisioned agents are left alone.
    pub async fn cleanup(&self) {
        let Some(client) = &self.client else {
            return;
        };
        if !*self.owns_agent.lock().await {
            return;
        }
        let agent = self.agent.lock().await;
        if let Some(agent) = agent.as_ref() {
            if let Err(e) = client.delete_agent(&agent.id).await {
                error!("Error during cleanup: {}", e);
            }
        }
    }
}

/// Relaxing poll schedule: aggressive early, widening toward 1.5 s.
pub fn poll_delay(iteration: u32) -> Duration {
    if iteration < 3 {
        Duration::from_millis(300)
    } else if iteration < 8 {
        Duration::from_millis(500)
    } else if iteration < 15 {
        Duration::from_millis(1000)
    } else {
        Duration::from_millis(1500)
    }
}
