use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::debug;

/// Paths served without any credential check.
const PUBLIC_PATHS: &[&str] = &["/health", "/api", "/api/test"];

/// Request gate for future credential checks. Currently a pass-through that
/// only logs non-public requests; the hook point exists so adding a real
/// scheme does not reshuffle the router.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !PUBLIC_PATHS.contains(&path) {
        debug!("{} {}", request.method(), path);
    }
    next.run(request).await
}
