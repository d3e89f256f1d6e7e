use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8000")]
    pub server_addr: String,

    /// Comma-separated list of allowed CORS origins. "*" allows any origin.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- Foundry Agent Service Args ---
    /// Base URL of the managed-agent (Azure AI Foundry) REST API. Empty disables
    /// the remote service and every chat call returns the mock payload.
    #[arg(long, env = "FOUNDRY_ENDPOINT", default_value = "")]
    pub foundry_endpoint: String,

    /// API key for the managed-agent service.
    #[arg(long, env = "FOUNDRY_API_KEY", default_value = "")]
    pub foundry_api_key: String,

    /// REST API version query parameter sent with every Foundry call.
    #[arg(long, env = "FOUNDRY_API_VERSION", default_value = "2024-12-01-preview")]
    pub foundry_api_version: String,

    /// Model deployment name used when creating agents and reported in responses.
    #[arg(long, env = "AGENT_MODEL_DEPLOYMENT_NAME", default_value = "gpt-4o")]
    pub model_deployment: String,

    /// Reuse this pre-provisioned agent id instead of creating a new agent.
    #[arg(long, env = "FOUNDRY_AGENT_ID")]
    pub foundry_agent_id: Option<String>,

    /// Instructions given to a newly created agent.
    #[arg(
        long,
        env = "AGENT_INSTRUCTIONS",
        default_value = "You are a helpful assistant. Be concise, cite sources when you use tools, and prefer direct answers over tool calls."
    )]
    pub agent_instructions: String,

    /// Directory of JSON knowledge files uploaded into a vector store for
    /// file search. Empty skips vector store setup.
    #[arg(long, env = "KNOWLEDGE_DIR", default_value = "")]
    pub knowledge_dir: String,

    /// Maximum run-status poll iterations before giving up on a run.
    #[arg(long, env = "RUN_POLL_MAX_ITERATIONS", default_value = "30")]
    pub run_poll_max_iterations: u32,

    // --- Orchestrator Router Args ---
    /// Agent id of the orchestrator in the multi-agent router.
    #[arg(long, env = "ORCHESTRATOR_AGENT_ID")]
    pub orchestrator_agent_id: Option<String>,

    /// Agent id of the first specialist agent.
    #[arg(long, env = "AGENT1_ID")]
    pub agent1_id: Option<String>,

    /// Agent id of the second specialist agent.
    #[arg(long, env = "AGENT2_ID")]
    pub agent2_id: Option<String>,

    /// Seconds to wait for an orchestrator run before declaring a timeout.
    #[arg(long, env = "ORCHESTRATOR_WAIT_SECS", default_value = "60")]
    pub orchestrator_wait_secs: u64,

    /// Retries around the post/run/poll sequence before falling back to a
    /// mock response. A fresh thread is created between attempts.
    #[arg(long, env = "ORCHESTRATOR_MAX_RETRIES", default_value = "2")]
    pub orchestrator_max_retries: u32,

    // --- Direct GPT Args ---
    /// Azure OpenAI endpoint for direct chat completions (agent invoke,
    /// sentiment, summaries). Empty enables mock mode.
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    pub openai_endpoint: String,

    /// Azure OpenAI API key.
    #[arg(long, env = "AZURE_OPENAI_API_KEY", default_value = "")]
    pub openai_api_key: String,

    /// Azure OpenAI REST API version.
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-06-01")]
    pub openai_api_version: String,

    // --- Search Tool Args ---
    /// Grounding connection id registered as a tool on newly created agents.
    #[arg(long, env = "GROUNDING_CONNECTION_ID")]
    pub grounding_connection_id: Option<String>,

    /// Grounding search endpoint tried first by the search tool.
    #[arg(long, env = "GROUNDING_ENDPOINT", default_value = "")]
    pub grounding_endpoint: String,

    /// API key for the grounding search endpoint.
    #[arg(long, env = "GROUNDING_API_KEY", default_value = "")]
    pub grounding_api_key: String,

    /// Subscription key for the direct web search API fallback.
    #[arg(long, env = "SEARCH_API_KEY", default_value = "")]
    pub search_api_key: String,

    /// Direct web search API endpoint.
    #[arg(
        long,
        env = "SEARCH_ENDPOINT",
        default_value = "https://api.bing.microsoft.com/v7.0/search"
    )]
    pub search_endpoint: String,

    /// Restrict search results to this site (e.g. "docs.example.com").
    #[arg(long, env = "SEARCH_SITE_FILTER", default_value = "")]
    pub search_site_filter: String,

    // --- Store Args ---
    /// Session store backend ("memory" is the only supported type).
    #[arg(long, env = "SESSION_STORE_TYPE", default_value = "memory")]
    pub session_store_type: String,

    // --- General App Args ---
    /// Enable debug logging/output.
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Application name reported by the health endpoint.
    #[arg(long, env = "APP_NAME", default_value = "Foundry Agent Backend")]
    pub app_name: String,
}

impl Args {
    /// True when a usable Foundry endpoint is configured. Placeholder values
    /// from sample env files ("https://your-...") count as unconfigured.
    pub fn foundry_configured(&self) -> bool {
        !self.foundry_endpoint.is_empty() && !self.foundry_endpoint.starts_with("https://your-")
    }

    pub fn openai_configured(&self) -> bool {
        !self.openai_endpoint.is_empty() && !self.openai_api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_endpoint_counts_as_unconfigured() {
        let mut args = Args::parse_from(["foundry-agent"]);
        assert!(!args.foundry_configured());
        args.foundry_endpoint = "https://your-project.services.ai.azure.com".into();
        assert!(!args.foundry_configured());
        args.foundry_endpoint = "https://real.services.ai.azure.com".into();
        assert!(args.foundry_configured());
    }

    #[test]
    fn defaults_match_demo_setup() {
        let args = Args::parse_from(["foundry-agent"]);
        assert_eq!(args.server_addr, "127.0.0.1:8000");
        assert_eq!(args.run_poll_max_iterations, 30);
        assert_eq!(args.orchestrator_max_retries, 2);
        assert_eq!(args.session_store_type, "memory");
    }
}
