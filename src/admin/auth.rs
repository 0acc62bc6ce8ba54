use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiResponse;
use crate::http::server::AppState;

/// Bearer-token check. An empty configured key disables auth.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let api_key = &state.settings.admin.api_key;
    if api_key.is_empty() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == api_key);

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated config request");
    let mut response = ApiResponse::failed("unauthorized", "missing or invalid bearer token", false)
        .into_response();
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}
