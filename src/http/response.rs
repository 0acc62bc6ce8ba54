//! Response envelope and error mapping.
//!
//! Mutations answer with
//! `{"status": "success"|"failed", "payload": {"type": ..., "reason": ...}}`.
//! Failures also carry `error.kind` and, for writes that reached memory but
//! not disk, `error.diverged`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: PayloadType,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub diverged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: Status,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ApiResponse {
    pub fn success(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            payload: Payload {
                kind: PayloadType::Success,
                reason: reason.into(),
            },
            error: None,
        }
    }

    pub fn failed(kind: &str, reason: impl Into<String>, diverged: bool) -> Self {
        Self {
            status: Status::Failed,
            payload: Payload {
                kind: PayloadType::Error,
                reason: reason.into(),
            },
            error: Some(ErrorDetail {
                kind: kind.to_string(),
                diverged,
            }),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = match self.status {
            Status::Success => StatusCode::OK,
            Status::Failed => StatusCode::BAD_REQUEST,
        };
        (status, Json(self)).into_response()
    }
}

/// `ConfigError` rendered for HTTP clients.
#[derive(Debug)]
pub struct ApiError(pub ConfigError);

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::failed(self.0.kind(), self.0.to_string(), self.0.is_diverged());
        (self.status_code(), Json(body)).into_response()
    }
}

/// Body that could not be parsed as JSON.
pub fn json_decode_error(e: &serde_json::Error) -> Response {
    ApiError(ConfigError::Malformed(format!("invalid JSON body: {}", e))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success("Configuration Updated")).unwrap();
        assert_eq!(
            body,
            json!({"status": "success", "payload": {"type": "success", "reason": "Configuration Updated"}})
        );
    }

    #[test]
    fn test_client_errors_are_bad_request() {
        let err = ApiError(ConfigError::Malformed("nope".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_divergence_is_flagged() {
        let err = ConfigError::Persistence {
            source: StorageError::Unavailable("disk full".into()),
        };
        let api = ApiError(err);
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = ApiResponse::failed(api.0.kind(), api.0.to_string(), api.0.is_diverged());
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["error"], json!({"kind": "persistence", "diverged": true}));
    }
}
