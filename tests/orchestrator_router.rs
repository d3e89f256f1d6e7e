use axum::extract::{ Path, State };
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{ get, post };
use axum::{ Json, Router };
use clap::Parser;
use serde_json::json;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;

use foundry_agent::cli::Args;
use foundry_agent::service::orchestrator::{ AgentKind, OrchestratorService };
use foundry_agent::service::Degradation;

/// Remote API stand-in where all three router agents verify but every run
/// ends in failure. Threads are tracked so history lookups can 404 for
/// ids that were never created.
struct MockApi {
    threads_created: AtomicUsize,
    runs_created: AtomicUsize,
}

async fn spawn_mock() -> (String, Arc<MockApi>) {
    let api = Arc::new(MockApi {
        threads_created: AtomicUsize::new(0),
        runs_created: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/assistants/{id}", get(get_agent))
        .route("/threads", post(create_thread))
        .route("/threads/{id}/messages", post(create_message).get(list_messages))
        .route("/threads/{id}/runs", post(create_run))
        .route("/threads/{id}/runs/{run_id}", get(get_run))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, api)
}

async fn get_agent(Path(id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({"id": id, "name": "verified", "model": "gpt-4o"}))
}

async fn create_thread(State(api): State<Arc<MockApi>>) -> Json<serde_json::Value> {
    let n = api.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"id": format!("thread_{}", n)}))
}

async fn create_message(Path(thread_id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({"id": format!("msg_{}", thread_id), "role": "user", "content": []}))
}

async fn list_messages(
    State(api): State<Arc<MockApi>>,
    Path(thread_id): Path<String>
) -> impl IntoResponse {
    let known = thread_id
        .strip_prefix("thread_")
        .and_then(|n| n.parse::<usize>().ok())
        .is_some_and(|n| n >= 1 && n <= api.threads_created.load(Ordering::SeqCst));
    if !known {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "thread not found"}))).into_response();
    }
    Json(
        json!({"data": [{
            "id": "msg_reply",
            "role": "assistant",
            "content": [{"type": "text", "text": {"value": "archived answer"}}]
        }]})
    ).into_response()
}

async fn create_run(State(api): State<Arc<MockApi>>) -> Json<serde_json::Value> {
    let n = api.runs_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"id": format!("run_{}", n), "status": "queued"}))
}

async fn get_run(Path((_, run_id)): Path<(String, String)>) -> Json<serde_json::Value> {
    Json(
        json!({
            "id": run_id,
            "status": "failed",
            "last_error": {"code": "server_error", "message": "model blew up"}
        })
    )
}

async fn router_for(base_url: &str) -> OrchestratorService {
    let args = Args::parse_from([
        "foundry-agent",
        "--foundry-endpoint",
        base_url,
        "--orchestrator-agent-id",
        "asst_orch",
        "--agent1-id",
        "asst_one",
        "--agent2-id",
        "asst_two",
        "--orchestrator-max-retries",
        "0",
    ]);
    let service = OrchestratorService::from_args(&args);
    service.initialize().await;
    assert!(service.is_available().await);
    service
}

#[tokio::test]
async fn exhausted_retries_report_upstream_failure_not_mock() {
    let (base_url, api) = spawn_mock().await;
    let service = router_for(&base_url).await;

    let reply = service.process_message("hello").await;
    assert_eq!(reply.degraded, Some(Degradation::Upstream));
    assert!(reply.content.contains("error processing your request"));
    assert!(!reply.content.contains("Mock"));
    assert!(api.runs_created.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn failed_specialist_call_reports_upstream_failure() {
    let (base_url, _api) = spawn_mock().await;
    let service = router_for(&base_url).await;

    let reply = service.route_to(AgentKind::Agent1, "hello").await;
    assert_eq!(reply.agent_used, AgentKind::Agent1);
    assert_eq!(reply.degraded, Some(Degradation::Upstream));
}

#[tokio::test]
async fn history_distinguishes_unknown_thread_from_other_errors() {
    let (base_url, _api) = spawn_mock().await;
    let service = router_for(&base_url).await;

    let err = service.thread_history("thread_999").await.unwrap_err();
    assert!(err.is_not_found());

    let thread_id = service.new_session().await.unwrap();
    let history = service.thread_history(&thread_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "archived answer");
}
