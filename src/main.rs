use clap::Parser;
use dotenv::dotenv;
use foundry_agent::cli::Args;
use log::info;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder
        ::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("--- Core Configuration ---");
    info!("App Name: {}", args.app_name);
    info!("Server Address: {}", args.server_addr);
    info!("Agent Service Configured: {}", args.foundry_configured());
    info!("Model Deployment: {}", args.model_deployment);
    info!("Fixed Agent Id: {}", args.foundry_agent_id.as_deref().unwrap_or("none"));
    info!("Orchestrator Configured: {}", args.orchestrator_agent_id.is_some());
    info!("Chat Completions Configured: {}", args.openai_configured());
    info!("Session Store Type: {}", args.session_store_type);
    info!("Knowledge Dir: {}", if args.knowledge_dir.is_empty() {
        "none"
    } else {
        args.knowledge_dir.as_str()
    });
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    foundry_agent::run(args).await
}
