pub mod cli;
pub mod foundry;
pub mod models;
pub mod server;
pub mod service;
pub mod store;
pub mod tools;

use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::server::{ AppState, Server };
use crate::service::gpt::GptClient;
use crate::service::orchestrator::OrchestratorService;
use crate::service::AgentService;
use crate::store::AgentStore;
use crate::tools::search::SearchTool;

/// Wires the services and stores together and serves until shutdown.
pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let sessions = store::initialize_session_store(&args)?;
    let agents = Arc::new(AgentStore::new());
    let agent_service = Arc::new(AgentService::from_args(&args));
    let orchestrator = Arc::new(OrchestratorService::from_args(&args));
    let gpt = Arc::new(GptClient::from_args(&args));
    let search = Arc::new(SearchTool::from_args(&args));

    orchestrator.initialize().await;

    let state = AppState {
        agent_service,
        orchestrator,
        gpt,
        sessions,
        agents,
        search,
        args,
    };

    let server = Server::new(state);
    server.run().await
}
