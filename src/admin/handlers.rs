use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::engine::projection::ProjectionRequest;
use crate::http::response::{json_decode_error, ApiError, ApiResponse};
use crate::http::server::AppState;
use crate::lifecycle::RestartReason;

pub const MSG_UPDATED: &str = "Configuration Updated";
pub const MSG_UPDATED_RESTART: &str = "Restarting to apply the new configuration";
pub const MSG_IMPORTED: &str = "Configuration imported, restarting to apply it";
pub const MSG_RESET: &str = "Config reset to default values, restarting";

#[derive(Debug, Default, Deserialize)]
pub struct KeysQuery {
    /// Comma-separated top-level names.
    pub keys: Option<String>,
}

fn parse_body(body: &Bytes) -> Result<Value, Response> {
    serde_json::from_slice(body).map_err(|e| json_decode_error(&e))
}

/// Projection read. Names come from the body (a string or a list) and/or
/// `?keys=a,b`; none or only unknown names return everything.
pub async fn get_config(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
    body: Bytes,
) -> Response {
    let mut request = if body.iter().all(u8::is_ascii_whitespace) {
        ProjectionRequest::all()
    } else {
        match parse_body(&body) {
            Ok(value) => ProjectionRequest::from_value(&value),
            Err(response) => return response,
        }
    };
    if let Some(keys) = query.keys {
        request.extend(
            keys.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        );
    }

    Json(state.engine.project(&request)).into_response()
}

pub async fn put_config(State(state): State<AppState>, body: Bytes) -> Response {
    let raw = match parse_body(&body) {
        Ok(value) => value,
        Err(response) => return response,
    };

    match state.engine.apply_update(raw) {
        Ok(outcome) if outcome.restart_required => state
            .restart
            .defer(RestartReason::ConfigUpdated)
            .attach(ApiResponse::success(MSG_UPDATED_RESTART).into_response()),
        Ok(_) => ApiResponse::success(MSG_UPDATED).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn post_config(State(state): State<AppState>, body: Bytes) -> Response {
    let raw = match parse_body(&body) {
        Ok(value) => value,
        Err(response) => return response,
    };

    match state.engine.import_config(raw) {
        Ok(_) => state
            .restart
            .defer(RestartReason::ConfigImported)
            .attach(ApiResponse::success(MSG_IMPORTED).into_response()),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn delete_config(State(state): State<AppState>) -> Response {
    match state.engine.reset_to_defaults() {
        Ok(()) => state
            .restart
            .defer(RestartReason::ConfigReset)
            .attach(ApiResponse::success(MSG_RESET).into_response()),
        Err(e) => ApiError(e).into_response(),
    }
}
