//! Error handling module for the bidder console.
//!
//! A single error type is shared by the client side (project directory, REST
//! wrappers) and the reference backend, which maps it onto HTTP status codes
//! and a JSON error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BACKEND_ERROR: &str = "BACKEND_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const NETWORK_NOT_CONFIGURED: &str = "NETWORK_NOT_CONFIGURED";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Message type used for error entries in [`ErrorResponse::messages`].
pub const MESSAGE_TYPE_ERROR: &str = "ERROR";

/// Console error type.
///
/// `Clone` because a failed snapshot load is shared by every reader of the
/// project directory.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// Resource not found (also the directory's lookup miss)
    NotFound(String),
    /// Backend answered with a non-success status
    Backend {
        status: u16,
        message: String,
        messages: Vec<String>,
    },
    /// Request never produced a response
    Transport(String),
    /// Response body could not be decoded
    Decode(String),
    /// Compute resource requested on a project without a network
    NetworkNotConfigured(String),
    /// Authentication required
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Validation error
    Validation(String),
    /// Resource already exists or is in a conflicting state
    Conflict(String),
    /// Bad request
    BadRequest(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

/// Result alias used throughout the crate.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConsoleError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsoleError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ConsoleError::Transport(_) => StatusCode::BAD_GATEWAY,
            ConsoleError::Decode(_) => StatusCode::BAD_GATEWAY,
            ConsoleError::NetworkNotConfigured(_) => StatusCode::CONFLICT,
            ConsoleError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ConsoleError::Forbidden(_) => StatusCode::FORBIDDEN,
            ConsoleError::Validation(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Conflict(_) => StatusCode::CONFLICT,
            ConsoleError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsoleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConsoleError::NotFound(_) => codes::NOT_FOUND,
            ConsoleError::Backend { .. } => codes::BACKEND_ERROR,
            ConsoleError::Transport(_) => codes::TRANSPORT_ERROR,
            ConsoleError::Decode(_) => codes::DECODE_ERROR,
            ConsoleError::NetworkNotConfigured(_) => codes::NETWORK_NOT_CONFIGURED,
            ConsoleError::Unauthorized(_) => codes::UNAUTHORIZED,
            ConsoleError::Forbidden(_) => codes::FORBIDDEN,
            ConsoleError::Validation(_) => codes::VALIDATION_ERROR,
            ConsoleError::Conflict(_) => codes::CONFLICT,
            ConsoleError::BadRequest(_) => codes::BAD_REQUEST,
            ConsoleError::Database(_) => codes::DATABASE_ERROR,
            ConsoleError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ConsoleError::NotFound(msg) => msg.clone(),
            ConsoleError::Backend { message, .. } => message.clone(),
            ConsoleError::Transport(msg) => msg.clone(),
            ConsoleError::Decode(msg) => msg.clone(),
            ConsoleError::NetworkNotConfigured(msg) => msg.clone(),
            ConsoleError::Unauthorized(msg) => msg.clone(),
            ConsoleError::Forbidden(msg) => msg.clone(),
            ConsoleError::Validation(msg) => msg.clone(),
            ConsoleError::Conflict(msg) => msg.clone(),
            ConsoleError::BadRequest(msg) => msg.clone(),
            ConsoleError::Database(msg) => msg.clone(),
            ConsoleError::Internal(msg) => msg.clone(),
        }
    }

    /// HTTP status the backend answered with, when there was an answer.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ConsoleError::Backend { status, .. } => Some(*status),
            ConsoleError::NotFound(_) => Some(StatusCode::NOT_FOUND.as_u16()),
            _ => None,
        }
    }

    /// Whether this is a lookup miss, locally or on the backend.
    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// Build an error from a non-success backend answer.
    ///
    /// 404 becomes [`ConsoleError::NotFound`]; everything else is passed
    /// through as [`ConsoleError::Backend`] with the server's messages.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let envelope = serde_json::from_str::<ErrorResponse>(body).ok();
        let message = envelope
            .as_ref()
            .map(|e| e.error.message.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });

        if status == StatusCode::NOT_FOUND {
            return ConsoleError::NotFound(message);
        }

        let messages = envelope
            .map(|e| {
                e.messages
                    .into_iter()
                    .filter(|m| m.message_type == MESSAGE_TYPE_ERROR)
                    .map(|m| m.message)
                    .collect()
            })
            .unwrap_or_default();

        ConsoleError::Backend {
            status: status.as_u16(),
            message,
            messages,
        }
    }
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ConsoleError {}

impl From<sqlx::Error> for ConsoleError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ConsoleError::Database(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP client error: {:?}", err);
        if err.is_decode() {
            ConsoleError::Decode(format!("Invalid response body: {}", err))
        } else {
            ConsoleError::Transport(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        ConsoleError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// One user-facing message attached to an error response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub message_type: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
    #[serde(default)]
    pub messages: Vec<ErrorMessage>,
}

impl ErrorResponse {
    pub fn new(error: &ConsoleError) -> Self {
        Self {
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
            messages: vec![ErrorMessage {
                message_type: MESSAGE_TYPE_ERROR.to_string(),
                message: error.message(),
            }],
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_not_found() {
        let err = ConsoleError::from_response(StatusCode::NOT_FOUND, "");
        assert_eq!(err, ConsoleError::NotFound("Not Found".to_string()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_response_reads_envelope() {
        let body = serde_json::to_string(&ErrorResponse::new(&ConsoleError::Forbidden(
            "No write access to project 7".to_string(),
        )))
        .unwrap();

        let err = ConsoleError::from_response(StatusCode::FORBIDDEN, &body);
        match err {
            ConsoleError::Backend {
                status,
                message,
                messages,
            } => {
                assert_eq!(status, 403);
                assert_eq!(message, "No write access to project 7");
                assert_eq!(messages, vec!["No write access to project 7".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_response_plain_body() {
        let err = ConsoleError::from_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.message(), "upstream down");
        assert_eq!(err.http_status(), Some(502));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display_includes_code() {
        let err = ConsoleError::Validation("Description is required".to_string());
        assert_eq!(err.to_string(), "VALIDATION_ERROR: Description is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
