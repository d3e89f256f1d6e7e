pub mod agent;
pub mod auth;
pub mod chat;
pub mod error;
pub mod foundry;

use axum::extract::State;
use axum::http::{ HeaderValue, Method };
use axum::routing::{ delete, get, post, put };
use axum::{ middleware, Json, Router };
use log::{ error, info };
use serde::Serialize;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{ AllowOrigin, Any, CorsLayer };

use crate::cli::Args;
use crate::service::gpt::GptClient;
use crate::service::orchestrator::OrchestratorService;
use crate::service::AgentService;
use crate::store::{ AgentStore, SessionStore };
use crate::tools::search::SearchTool;

#[derive(Clone)]
pub struct AppState {
    pub agent_service: Arc<AgentService>,
    pub orchestrator: Arc<OrchestratorService>,
    pub gpt: Arc<GptClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub agents: Arc<AgentStore>,
    pub search: Arc<SearchTool>,
    pub args: Args,
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(state: AppState) -> Router {
        let cors = build_cors(&state.args.cors_origins);

        Router::new()
            .route("/health", get(health_handler))
            .route("/api", get(api_root_handler))
            .route("/api/test", get(api_test_handler))
            .route("/api/v1/chat/message", post(chat::send_message))
            .route("/api/v1/chat/history/{session_id}", get(chat::get_history))
            .route("/api/v1/chat/sessions", get(chat::list_sessions))
            .route("/api/v1/chat/sessions/{session_id}", delete(chat::delete_session))
            .route("/api/v1/chat/sessions/{session_id}/clear", post(chat::clear_session))
            .route("/api/v1/chat/sessions/{session_id}/summary", post(chat::summarize_session))
            .route("/api/v1/chat/sentiment", post(chat::analyze_sentiment))
            .route("/api/v1/chat/foundry/chat", post(foundry::orchestrator_chat))
            .route("/api/v1/chat/foundry/orchestrator", post(foundry::orchestrator_chat))
            .route("/api/v1/chat/foundry/agent1", post(foundry::agent1_chat))
            .route("/api/v1/chat/foundry/agent2", post(foundry::agent2_chat))
            .route("/api/v1/chat/foundry/status", get(foundry::status))
            .route("/api/v1/chat/foundry/history/{thread_id}", get(foundry::thread_history))
            .route("/api/v1/chat/foundry/new-session", post(foundry::new_session))
            .route("/api/v1/chat/foundry/health", get(foundry::health))
            .route("/api/v1/agent/create", post(agent::create_agent))
            .route("/api/v1/agent", get(agent::list_agents))
            .route("/api/v1/agent/{agent_id}", get(agent::get_agent))
            .route("/api/v1/agent/{agent_id}", put(agent::update_agent))
            .route("/api/v1/agent/{agent_id}", delete(agent::delete_agent))
            .route("/api/v1/agent/{agent_id}/invoke", post(agent::invoke_agent))
            .route("/api/v1/agent/{agent_id}/metrics", get(agent::get_metrics))
            .route("/api/v1/agent/{agent_id}/activate", post(agent::activate_agent))
            .route("/api/v1/agent/{agent_id}/deactivate", post(agent::deactivate_agent))
            .route("/api/v1/agent/{agent_id}/status", get(agent::get_status))
            .layer(middleware::from_fn(auth::auth_middleware))
            .layer(cors)
            .with_state(state)
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.state.args.server_addr.parse::<SocketAddr>()?;
        let args = self.state.args.clone();
        let app = Self::router(self.state.clone());

        if args.enable_tls && args.tls_cert_path.is_some() && args.tls_key_path.is_some() {
            let cert_path = args.tls_cert_path.as_ref().unwrap();
            let key_path = args.tls_key_path.as_ref().unwrap();
            let tls_config = axum_server::tls_rustls::RustlsConfig
                ::from_pem_file(cert_path, key_path).await?;

            info!("Starting HTTPS server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            info!("Starting HTTP server on: http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                e
            })?;
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }

        info!("Server stopped, cleaning up remote resources");
        self.state.agent_service.cleanup().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn build_cors(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|o| o.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    app: String,
    version: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        app: state.args.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ApiRootResponse {
    message: &'static str,
    docs: &'static str,
}

async fn api_root_handler() -> Json<ApiRootResponse> {
    Json(ApiRootResponse {
        message: "Agent backend API is running",
        docs: "/api/test",
    })
}

#[derive(Serialize)]
struct ApiTestResponse {
    status: &'static str,
    endpoints: Vec<&'static str>,
}

async fn api_test_handler() -> Json<ApiTestResponse> {
    Json(ApiTestResponse {
        status: "ok",
        endpoints: vec![
            "/api/v1/chat/message",
            "/api/v1/chat/history/{session_id}",
            "/api/v1/chat/sessions",
            "/api/v1/chat/sentiment",
            "/api/v1/chat/foundry/chat",
            "/api/v1/chat/foundry/status",
            "/api/v1/agent/create",
            "/api/v1/agent"
        ],
    })
}
