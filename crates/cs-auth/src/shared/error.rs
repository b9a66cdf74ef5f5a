//! Auth Error Types
//!
//! The core reports typed failures; `IntoResponse` is the single place where
//! they become an HTTP status and an error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::shared::api_common::ApiResponse;

pub const AUTHORIZATION_REQUIRED: &str = "authorization required";
pub const INVALID_HEADER_FORMAT: &str = "invalid header format";
pub const INVALID_OR_EXPIRED_TOKEN: &str = "invalid or expired token";
pub const USER_NOT_FOUND: &str = "user not found";
pub const ACCOUNT_INACTIVE: &str = "account is inactive";
pub const INSUFFICIENT_PERMISSIONS: &str = "insufficient permissions";
pub const ORGANIZATION_ACCESS_DENIED: &str = "access denied to this organization";
pub const INVALID_CREDENTIALS: &str = "invalid email or password";
pub const REFRESH_TOKEN_REQUIRED: &str = "refresh token required";
pub const EMAIL_ALREADY_REGISTERED: &str = "email already registered";
pub const INVALID_PATH_PARAMETER: &str = "invalid path parameter";

/// Message sent to callers for every internal failure
const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed or missing input the caller can fix
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Bad credentials or an invalid, expired or tampered token
    #[error("{message}")]
    Authentication { message: String },

    /// Authenticated, but not allowed
    #[error("{message}")]
    Authorization { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// Primitive or backend failure; the message is logged, never returned
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }

    pub fn validation_with_details(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Validation { message: message.into(), details: Some(details) }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
            AuthError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Authorization { .. } => StatusCode::FORBIDDEN,
            AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
            AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation { .. } => "BAD_REQUEST",
            AuthError::Authentication { .. } => "UNAUTHORIZED",
            AuthError::Authorization { .. } => "FORBIDDEN",
            AuthError::NotFound { .. } => "NOT_FOUND",
            AuthError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AuthError::Internal { message } => {
                error!(error = %message, "Request failed with internal error");
                ApiResponse::<()>::failure(code, INTERNAL_MESSAGE, None)
            }
            AuthError::Validation { message, details } => {
                ApiResponse::<()>::failure(code, message, details)
            }
            AuthError::Authentication { message }
            | AuthError::Authorization { message }
            | AuthError::NotFound { message } => ApiResponse::<()>::failure(code, message, None),
        };

        body.into_response_with(status)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal { message: format!("database error: {}", err) }
    }
}
