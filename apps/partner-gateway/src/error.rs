//! Rich error handling for the partner gateway.
//!
//! Structured error types for the HTTP surface. Every error carries a stable
//! machine-readable code plus a user-safe message; upstream response bodies
//! and credentials never reach the caller.
//!
//! # HTTP Status Mapping
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `INVALID_EMAIL` / `INVALID_REQUEST` | 400 | Malformed input |
//! | `UPSTREAM_AUTH_FAILED` | 401 | Partner API rejected our credentials |
//! | `NOT_AFFILIATED` | 403 | Email is not linked to the partner ID |
//! | `THROTTLED` | 429 | Partner API rate limit exhausted |
//! | `UPSTREAM_ERROR` | 502 | Partner API failure or malformed payload |
//! | `UPSTREAM_TIMEOUT` | 504 | Partner API did not answer in time |
//! | `INTERNAL_ERROR` | 500 | Unexpected server error |

use std::collections::HashMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculators::CalculatorError;
use crate::partner::PartnerError;

/// Error codes exposed by the gateway API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (400)
    /// Invalid request format or missing fields.
    InvalidRequest,
    /// Email failed validation before any upstream call.
    InvalidEmail,

    // Affiliation outcome (403)
    /// The email is not affiliated with the platform's partner ID.
    NotAffiliated,

    // Upstream errors
    /// The partner API rejected the gateway's credentials or token.
    UpstreamAuthFailed,
    /// Partner API rate limit exhausted after bounded retries.
    Throttled,
    /// Partner API returned a server error or an unreadable payload.
    UpstreamError,
    /// Partner API did not answer within the client timeout.
    UpstreamTimeout,

    // Internal errors (500)
    /// Unexpected server error.
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::InvalidEmail => StatusCode::BAD_REQUEST,
            Self::NotAffiliated => StatusCode::FORBIDDEN,
            Self::UpstreamAuthFailed => StatusCode::UNAUTHORIZED,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable reason string used in response bodies.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::NotAffiliated => "NOT_AFFILIATED",
            Self::UpstreamAuthFailed => "UPSTREAM_AUTH_FAILED",
            Self::Throttled => "THROTTLED",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A gateway error with context for the HTTP surface.
#[derive(Debug, Error)]
pub struct GatewayError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable, user-safe message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl GatewayError {
    /// Create a new gateway error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert to an HTTP error response body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            code: self.code.reason().to_string(),
            message: self.message.clone(),
            details: self.context.iter().cloned().collect(),
        }
    }

    /// Invalid request format.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Email is not affiliated with the partner ID.
    #[must_use]
    pub fn not_affiliated(email: &str) -> Self {
        Self::new(
            ErrorCode::NotAffiliated,
            "This email is not registered under our broker partner",
        )
        .with_context("email", email)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

impl From<PartnerError> for GatewayError {
    fn from(err: PartnerError) -> Self {
        let code = match &err {
            PartnerError::InvalidEmail(_) => ErrorCode::InvalidEmail,
            PartnerError::AuthenticationFailed | PartnerError::Unauthorized => {
                ErrorCode::UpstreamAuthFailed
            }
            PartnerError::Throttled { .. } => ErrorCode::Throttled,
            PartnerError::Timeout => ErrorCode::UpstreamTimeout,
            PartnerError::Upstream { .. }
            | PartnerError::MalformedResponse(_)
            | PartnerError::Network(_) => ErrorCode::UpstreamError,
        };
        // User-safe wording; the original error stays in the logs only.
        let message = match code {
            ErrorCode::InvalidEmail => "Please enter a valid email address".to_string(),
            ErrorCode::UpstreamAuthFailed => {
                "Could not authenticate with the broker, please try again".to_string()
            }
            ErrorCode::Throttled => "Too many requests, please try again shortly".to_string(),
            ErrorCode::UpstreamTimeout => {
                "The broker did not respond in time, please try again".to_string()
            }
            _ => "The broker service is temporarily unavailable".to_string(),
        };
        Self::new(code, message)
    }
}

impl From<CalculatorError> for GatewayError {
    fn from(err: CalculatorError) -> Self {
        Self::new(ErrorCode::InvalidRequest, err.to_string())
    }
}

/// HTTP error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    pub details: HashMap<String, String>,
}
