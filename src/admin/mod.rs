//! Configuration API.
//!
//! # Routes
//! - `GET /api/config` project the live configuration
//! - `PUT /api/config` partial update
//! - `POST /api/config` import a full snapshot
//! - `DELETE /api/config` reset to defaults

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub const CONFIG_PATH: &str = "/api/config";

pub fn setup_config_router(state: AppState) -> Router {
    Router::new()
        .route(
            CONFIG_PATH,
            get(get_config)
                .put(put_config)
                .post(post_config)
                .delete(delete_config),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
