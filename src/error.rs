//! API error taxonomy and HTTP mapping.
//!
//! Handlers return `Result<_, ApiError>`; the `IntoResponse` impl is the
//! single place errors are translated to status codes and the
//! `{ "error": { "code", "message" } }` envelope. Internal error messages
//! are suppressed outside development mode.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{error, warn};

/// Whether internal error details may be exposed to clients.
/// Set once at startup from the environment config.
static DEV_MODE: OnceLock<bool> = OnceLock::new();

pub fn set_dev_mode(dev: bool) {
    let _ = DEV_MODE.set(dev);
}

fn dev_mode() -> bool {
    *DEV_MODE.get().unwrap_or(&true)
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid or expired token (401).
    #[error("{0}")]
    Auth(String),
    /// Authenticated but wrong role or tenant (403).
    #[error("{0}")]
    Forbidden(String),
    /// Referenced entity absent or not owned by the caller (404).
    #[error("{0}")]
    NotFound(String),
    /// Duplicate unique key (409).
    #[error("{0}")]
    Conflict(String),
    /// Request counter exceeded on a limited route (429).
    #[error("{0}")]
    RateLimited(String),
    /// Unexpected failure (500); message hidden outside development.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(msg) => {
                error!(error = %msg, "Internal error");
                if dev_mode() {
                    msg.clone()
                } else {
                    "Internal server error".to_string()
                }
            }
            other => {
                warn!(code = other.code(), error = %other, "Request failed");
                other.to_string()
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": self.code(),
                    "message": message,
                }
            })),
        )
            .into_response()
    }
}

/// Duplicate unique-key writes surface as a Mongo write error with code
/// 11000; everything else from the driver is an internal failure.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == 11000,
        _ => false,
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Self::Conflict("duplicate key".to_string())
        } else {
            Self::Internal(format!("database error: {err}"))
        }
    }
}

impl From<bson::oid::Error> for ApiError {
    fn from(_: bson::oid::Error) -> Self {
        Self::Validation("invalid identifier".to_string())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(format!("hashing error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("token error: {err}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("io error: {err}"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("json error: {err}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::auth("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::rate_limited("x").status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::internal("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(ApiError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(ApiError::conflict("x").code(), "CONFLICT");
        assert_eq!(ApiError::internal("x").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn invalid_object_id_maps_to_validation() {
        let err: ApiError = bson::oid::ObjectId::parse_str("nope").unwrap_err().into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
