use axum::extract::{ Path, State };
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{ get, post };
use axum::{ Json, Router };
use serde_json::json;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;

use foundry_agent::foundry::FoundryClient;
use foundry_agent::models::chat::{ ChatMessage, MessageRole };
use foundry_agent::service::{ AgentService, AgentServiceConfig, Degradation };

/// Stand-in for the remote managed-agent API. Run status is fixed per
/// server; counters expose how many resources were created.
struct MockApi {
    run_status: &'static str,
    known_agent: Option<&'static str>,
    agents_created: AtomicUsize,
    agents_deleted: AtomicUsize,
    threads_created: AtomicUsize,
    runs_created: AtomicUsize,
}

async fn spawn_mock(run_status: &'static str, known_agent: Option<&'static str>) -> (String, Arc<MockApi>) {
    let api = Arc::new(MockApi {
        run_status,
        known_agent,
        agents_created: AtomicUsize::new(0),
        agents_deleted: AtomicUsize::new(0),
        threads_created: AtomicUsize::new(0),
        runs_created: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/assistants", post(create_agent))
        .route("/assistants/{id}", get(get_agent).delete(delete_agent))
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

async fn create_agent(State(api): State<Arc<MockApi>>) -> Json<serde_json::Value> {
    let n = api.agents_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"id": format!("asst_{}", n), "name": "mock", "model": "gpt-4o"}))
}

async fn get_agent(
    State(api): State<Arc<MockApi>>,
    Path(id): Path<String>
) -> impl IntoResponse {
    match api.known_agent {
        Some(known) if known == id => {
            Json(json!({"id": id, "name": "prewired", "model": "gpt-4o"})).into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
    }
}

async fn delete_agent(
    State(api): State<Arc<MockApi>>,
    Path(id): Path<String>
) -> Json<serde_json::Value> {
    api.agents_deleted.fetch_add(1, Ordering::SeqCst);
    Json(json!({"id": id, "deleted": true}))
}

async fn create_thread(State(api): State<Arc<MockApi>>) -> Json<serde_json::Value> {
    let n = api.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"id": format!("thread_{}", n)}))
}

async fn create_message(Path(thread_id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({"id": format!("msg_in_{}", thread_id), "role": "user", "content": []}))
}

async fn list_messages(Path(thread_id): Path<String>) -> Json<serde_json::Value> {
    Json(
        json!({"data": [
        {
            "id": format!("msg_out_{}", thread_id),
            "role": "assistant",
            "content": [{"type": "text", "text": {"value": "the answer is 42"}}]
        },
        {
            "id": format!("msg_in_{}", thread_id),
            "role": "user",
            "content": [{"type": "text", "text": {"value": "question"}}]
        }
    ]})
    )
}

async fn create_run(State(api): State<Arc<MockApi>>) -> Json<serde_json::Value> {
    let n = api.runs_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"id": format!("run_{}", n), "status": "queued"}))
}

async fn get_run(
    State(api): State<Arc<MockApi>>,
    Path((_, run_id)): Path<(String, String)>
) -> Json<serde_json::Value> {
    let mut body = json!({"id": run_id, "status": api.run_status});
    if api.run_status == "failed" {
        body["last_error"] = json!({"code": "server_error", "message": "model blew up"});
    }
    Json(body)
}

fn service_for(base_url: &str, fixed_agent_id: Option<&str>, max_poll: u32) -> AgentService {
    let client = FoundryClient::new(base_url, "test-key", "2024-12-01-preview").unwrap();
    AgentService::new(Some(client), AgentServiceConfig {
        model_deployment: "gpt-4o".to_string(),
        fixed_agent_id: fixed_agent_id.map(String::from),
        instructions: "be brief".to_string(),
        knowledge_dir: String::new(),
        grounding_connection_id: None,
        max_poll_iterations: max_poll,
    })
}

fn user(content: &str) -> ChatMessage {
    ChatMessage::new(MessageRole::User, content)
}

#[tokio::test]
async fn completed_run_returns_assistant_text() {
    let (base_url, api) = spawn_mock("completed", None).await;
    let service = service_for(&base_url, None, 5);

    let reply = service.generate_response("s1", &[user("question")]).await;
    assert_eq!(reply.content, "the answer is 42");
    assert_eq!(reply.model_used, "gpt-4o");
    assert_eq!(reply.tokens_used, 100);
    assert!(reply.degraded.is_none());
    assert_eq!(api.agents_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_run_degrades_with_run_failed() {
    let (base_url, _api) = spawn_mock("failed", None).await;
    let service = service_for(&base_url, None, 5);

    let reply = service.generate_response("s1", &[user("question")]).await;
    assert_eq!(reply.degraded, Some(Degradation::RunFailed));
    assert_eq!(reply.tokens_used, 0);
    assert!(reply.content.contains("error processing your request"));
}

#[tokio::test]
async fn stuck_run_times_out_after_bounded_polling() {
    let (base_url, _api) = spawn_mock("in_progress", None).await;
    let service = service_for(&base_url, None, 2);

    let reply = service.generate_response("s1", &[user("question")]).await;
    assert_eq!(reply.degraded, Some(Degradation::Timeout));
    assert!(reply.content.contains("Timeout"));
}

#[tokio::test]
async fn sessions_get_their_own_threads() {
    let (base_url, api) = spawn_mock("completed", None).await;
    let service = service_for(&base_url, None, 5);

    service.generate_response("alice", &[user("hi")]).await;
    service.generate_response("bob", &[user("hi")]).await;
    service.generate_response("alice", &[user("again")]).await;

    // Two sessions, two threads; repeat calls reuse the session's thread.
    assert_eq!(api.threads_created.load(Ordering::SeqCst), 2);
    // One agent serves every session.
    assert_eq!(api.agents_created.load(Ordering::SeqCst), 1);
    assert_eq!(api.runs_created.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn configured_agent_id_is_reused_not_recreated() {
    let (base_url, api) = spawn_mock("completed", Some("asst_prewired")).await;
    let service = service_for(&base_url, Some("asst_prewired"), 5);

    let reply = service.generate_response("s1", &[user("hi")]).await;
    assert!(reply.degraded.is_none());
    assert_eq!(api.agents_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cleanup_deletes_the_agent_it_created() {
    let (base_url, api) = spawn_mock("completed", None).await;
    let service = service_for(&base_url, None, 5);

    service.generate_response("s1", &[user("hi")]).await;
    service.cleanup().await;
    assert_eq!(api.agents_deleted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cleanup_leaves_preprovisioned_agents_alone() {
    let (base_url, api) = spawn_mock("completed", Some("asst_prewired")).await;
    let service = service_for(&base_url, Some("asst_prewired"), 5);

    service.generate_response("s1", &[user("hi")]).await;
    service.cleanup().await;
    assert_eq!(api.agents_deleted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_configured_agent_falls_back_to_create() {
    let (base_url, api) = spawn_mock("completed", None).await;
    let service = service_for(&base_url, Some("asst_gone"), 5);

    let reply = service.generate_response("s1", &[user("hi")]).await;
    assert!(reply.degraded.is_none());
    assert_eq!(api.agents_created.load(Ordering::SeqCst), 1);
}
