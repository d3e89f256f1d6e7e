use log::{ error, info, warn };
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::time::{ Duration, Instant };
use tokio::sync::Mutex;

use crate::cli::Args;
use crate::foundry::wire::RunStatus;
use crate::foundry::{ FoundryClient, FoundryError };
use crate::models::chat::ChatMessage;
use crate::models::chat::MessageRole;
use crate::service::Degradation;

/// Which remote agent a request is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Orchestrator,
    Agent1,
    Agent2,
}

impl AgentKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "orchestrator" => Some(AgentKind::Orchestrator),
            "agent1" => Some(AgentKind::Agent1),
            "agent2" => Some(AgentKind::Agent2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Orchestrator => "orchestrator",
            AgentKind::Agent1 => "agent1",
            AgentKind::Agent2 => "agent2",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentStatus {
    pub id: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrchestratorStatus {
    pub service_available: bool,
    pub orchestrator: AgentStatus,
    pub agent1: AgentStatus,
    pub agent2: AgentStatus,
}

/// Reply from the multi-agent router. Like the single-agent service, this is
/// always produced; failure modes surface through `degraded`.
#[derive(Clone, Debug)]
pub struct OrchestratorReply {
    pub content: String,
    pub agent_used: AgentKind,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub response_time: f64,
    pub degraded: Option<Degradation>,
}

struct AgentIds {
    orchestrator: Option<String>,
    agent1: Option<String>,
    agent2: Option<String>,
}

impl AgentIds {
    fn get(&self, kind: AgentKind) -> Option<&String> {
        match kind {
            AgentKind::Orchestrator => self.orchestrator.as_ref(),
            AgentKind::Agent1 => self.agent1.as_ref(),
            AgentKind::Agent2 => self.agent2.as_ref(),
        }
    }
}

/// Routes chat messages to pre-provisioned remote agents: an orchestrator
/// that delegates on its own, plus two directly addressable specialists.
/// All three ids must verify at startup or the router stays in mock mode.
pub struct OrchestratorService {
    client: Option<FoundryClient>,
    ids: AgentIds,
    wait_secs: u64,
    max_retries: u32,
    /// One conversation thread shared across orchestrator calls until a
    /// caller asks for a new session.
    thread: Mutex<Option<String>>,
    available: Mutex<bool>,
}

impl OrchestratorService {
    pub fn from_args(args: &Args) -> Self {
        let client = if args.foundry_configured() {
            match FoundryClient::from_args(args) {
                Ok(client) => Some(client),
                Err(e) => {
                    error!("Failed to build orchestrator client: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self {
            client,
            ids: AgentIds {
                orchestrator: args.orchestrator_agent_id.clone(),
                agent1: args.agent1_id.clone(),
                agent2: args.agent2_id.clone(),
            },
            wait_secs: args.orchestrator_wait_secs,
            max_retries: args.orchestrator_max_retries,
            thread: Mutex::new(None),
            available: Mutex::new(false),
        }
    }

    /// Verifies every configured agent id against the remote service. Any
    /// missing or unverifiable agent leaves the router unavailable.
    pub async fn initialize(&self) {
        let Some(client) = &self.client else {
            warn!("Orchestrator router not configured, using mock responses");
            return;
        };

        for kind in [AgentKind::Orchestrator, AgentKind::Agent1, AgentKind::Agent2] {
            let Some(id) = self.ids.get(kind) else {
                warn!("No agent id configured for {}", kind);
                return;
            };
            match client.get_agent(id).await {
                Ok(agent) => info!("Verified {} agent: {} ({})", kind, agent.id, agent.name.as_deref().unwrap_or("unnamed")),
                Err(e) => {
                    error!("Failed to verify {} agent {}: {}", kind, id, e);
                    return;
                }
            }
        }

        *self.available.lock().await = true;
        info!("Orchestrator router initialized with all agents verified");
    }

    pub async fn is_available(&self) -> bool {
        *self.available.lock().await
    }

    /// Sends a message through the orchestrator with retries. Each retry
    /// abandons the current thread and starts a fresh one after a pause.
    pub async fn process_message(&self, message: &str) -> OrchestratorReply {
        let start = Instant::now();
        if !self.is_available().await {
            return self.mock_reply(AgentKind::Orchestrator, start);
        }

        let mut attempt: u32 = 0;
        loop {
            match self.run_once(AgentKind::Orchestrator, message, true).await {
                Ok(reply) => return reply,
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!("Orchestrator failed after {} attempts: {}", attempt, e);
                        return self.failure_reply(AgentKind::Orchestrator, start);
                    }
                    warn!("Orchestrator attempt {} failed, retrying with a fresh thread: {}", attempt, e);
                    *self.thread.lock().await = None;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    /// Single-shot routing to a specialist agent on a throwaway thread.
    pub async fn route_to(&self, kind: AgentKind, message: &str) -> OrchestratorReply {
        let start = Instant::now();
        if !self.is_available().await {
            return self.mock_reply(kind, start);
        }
        match self.run_once(kind, message, false).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Direct call to {} failed: {}", kind, e);
                self.failure_reply(kind, start)
            }
        }
    }

    async fn run_once(
        &self,
        kind: AgentKind,
        message: &str,
        reuse_thread: bool
    ) -> Result<OrchestratorReply, Box<dyn Error + Send + Sync>> {
        let start = Instant::now();
        let client = self.client.as_ref().ok_or("no client")?;
        let agent_id = self.ids.get(kind).ok_or("agent id not configured")?.clone();

        let thread_id = if reuse_thread {
            let mut thread = self.thread.lock().await;
            match thread.as_ref() {
                Some(id) => id.clone(),
                None => {
                    let created = client.create_thread().await?;
                    *thread = Some(created.id.clone());
                    created.id
                }
            }
        } else {
            client.create_thread().await?.id
        };

        client.create_message(&thread_id, message).await?;
        let mut run = client.create_run(&thread_id, &agent_id).await?;
        info!("Started run {} on {} (thread {})", run.id, kind, thread_id);

        let mut waited: u64 = 0;
        while !run.status.is_terminal() && waited < self.wait_secs {
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
            run = client.get_run(&thread_id, &run.id).await?;
        }

        if run.status != RunStatus::Completed {
            return Err(format!("run {} ended with status {:?} after {}s", run.id, run.status, waited).into());
        }

        let Some(reply) = client.last_assistant_message(&thread_id).await? else {
            return Err("run completed but no assistant message found".into());
        };

        Ok(OrchestratorReply {
            content: reply.text(),
            agent_used: kind,
            thread_id: Some(thread_id),
            run_id: Some(run.id),
            response_time: start.elapsed().as_secs_f64(),
            degraded: None,
        })
    }

    /// Reply for a configured router whose backend failed. Distinct from
    /// the mock reply so callers can tell "not configured" from "upstream
    /// broke" by the degradation code.
    fn failure_reply(&self, kind: AgentKind, start: Instant) -> OrchestratorReply {
        OrchestratorReply {
            content: "Sorry, there was an error processing your request.".to_string(),
            agent_used: kind,
            thread_id: None,
            run_id: None,
            response_time: start.elapsed().as_secs_f64(),
            degraded: Some(Degradation::Upstream),
        }
    }

    fn mock_reply(&self, kind: AgentKind, start: Instant) -> OrchestratorReply {
        let content = match kind {
            AgentKind::Orchestrator => {
                "Mock orchestrator response: I would analyze your request and route it to the right specialist agent."
            }
            AgentKind::Agent1 => {
                "Mock specialist response from agent1: I would handle research and information lookups."
            }
            AgentKind::Agent2 => {
                "Mock specialist response from agent2: I would handle analysis and summarization tasks."
            }
        };
        OrchestratorReply {
            content: content.to_string(),
            agent_used: kind,
            thread_id: None,
            run_id: None,
            response_time: start.elapsed().as_secs_f64().max(0.001),
            degraded: Some(Degradation::NoClient),
        }
    }

    /// Per-agent view for the status endpoint. Queries the remote service
    /// live so stale verification does not mask a deleted agent.
    pub async fn get_status(&self) -> OrchestratorStatus {
        let mut statuses = Vec::with_capacity(3);
        for kind in [AgentKind::Orchestrator, AgentKind::Agent1, AgentKind::Agent2] {
            let status = match (self.client.as_ref(), self.ids.get(kind)) {
                (Some(client), Some(id)) => match client.get_agent(id).await {
                    Ok(agent) => AgentStatus {
                        id: Some(agent.id),
                        status: "online".to_string(),
                        name: agent.name,
                        model: agent.model,
                    },
                    Err(e) => AgentStatus {
                        id: Some(id.clone()),
                        status: format!("error: {}", e),
                        name: None,
                        model: None,
                    },
                },
                _ => AgentStatus {
                    id: self.ids.get(kind).cloned(),
                    status: "not_configured".to_string(),
                    name: None,
                    model: None,
                },
            };
            statuses.push(status);
        }
        let mut iter = statuses.into_iter();
        OrchestratorStatus {
            service_available: self.is_available().await,
            orchestrator: iter.next().unwrap_or_else(missing_status),
            agent1: iter.next().unwrap_or_else(missing_status),
            agent2: iter.next().unwrap_or_else(missing_status),
        }
    }

    /// Full message history of a remote thread, oldest first. A 404 from
    /// the remote API means the thread id is unknown; other errors are
    /// transport or configuration failures.
    pub async fn thread_history(
        &self,
        thread_id: &str
    ) -> Result<Vec<ChatMessage>, FoundryError> {
        let client = self.client
            .as_ref()
            .ok_or_else(|| FoundryError::Config("router client not configured".to_string()))?;
        let mut messages = client.list_messages(thread_id).await?;
        messages.reverse();
        Ok(messages
            .into_iter()
            .map(|m| {
                let role = if m.role == "assistant" {
                    MessageRole::Assistant
                } else {
                    MessageRole::User
                };
                ChatMessage::new(role, m.text())
            })
            .collect())
    }

    /// Abandons the shared orchestrator thread and starts a new one.
    pub async fn new_session(&self) -> Result<String, FoundryError> {
        let client = self.client
            .as_ref()
            .ok_or_else(|| FoundryError::Config("router client not configured".to_string()))?;
        let created = client.create_thread().await?;
        let mut thread = self.thread.lock().await;
        *thread = Some(created.id.clone());
        Ok(created.id)
    }
}

fn missing_status() -> AgentStatus {
    AgentStatus {
        id: None,
        status: "not_configured".to_string(),
        name: None,
        model: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn unconfigured() -> OrchestratorService {
        OrchestratorService::from_args(&Args::parse_from(["foundry-agent"]))
    }

    #[tokio::test]
    async fn unconfigured_router_stays_unavailable() {
        let service = unconfigured();
        service.initialize().await;
        assert!(!service.is_available().await);
    }

    #[tokio::test]
    async fn mock_replies_are_per_agent() {
        let service = unconfigured();
        let orchestrator = service.process_message("hello").await;
        let agent1 = service.route_to(AgentKind::Agent1, "hello").await;
        let agent2 = service.route_to(AgentKind::Agent2, "hello").await;

        assert_eq!(orchestrator.agent_used, AgentKind::Orchestrator);
        assert_eq!(agent1.agent_used, AgentKind::Agent1);
        assert_ne!(agent1.content, agent2.content);
        assert_eq!(orchestrator.degraded, Some(Degradation::NoClient));
        assert!(orchestrator.thread_id.is_none());
    }

    #[tokio::test]
    async fn status_reports_not_configured() {
        let service = unconfigured();
        let status = service.get_status().await;
        assert!(!status.service_available);
        assert_eq!(status.orchestrator.status, "not_configured");
        assert_eq!(status.agent1.status, "not_configured");
    }
}
