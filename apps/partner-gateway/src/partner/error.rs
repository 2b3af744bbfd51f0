//! Partner API error types.

use thiserror::Error;

/// Errors from the partner API client.
#[derive(Debug, Error, Clone)]
pub enum PartnerError {
    /// Email failed validation before any upstream call.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Login failed (non-2xx, timeout, or no token in the body).
    #[error("authentication with partner API failed")]
    AuthenticationFailed,

    /// The affiliation call was rejected even after a token refresh.
    #[error("partner API rejected the token after refresh")]
    Unauthorized,

    /// Rate limited and retries exhausted.
    #[error("partner API rate limited, retry after {retry_after_secs}s")]
    Throttled {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Server error (5xx) and retries exhausted.
    #[error("partner API error: HTTP {status}")]
    Upstream {
        /// HTTP status code returned upstream.
        status: u16,
        /// Error message extracted from the body (logs only).
        message: String,
    },

    /// Client-side timeout; fails fast with no retry.
    #[error("partner API request timed out")]
    Timeout,

    /// Response body could not be parsed.
    #[error("malformed partner API response: {0}")]
    MalformedResponse(String),

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl PartnerError {
    /// Build from a reqwest transport error, separating timeouts from
    /// connection failures.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.without_url().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_does_not_leak_body() {
        let err = PartnerError::Upstream {
            status: 503,
            message: "internal stack trace".to_string(),
        };
        assert_eq!(err.to_string(), "partner API error: HTTP 503");
    }

    #[test]
    fn throttled_display_includes_delay() {
        let err = PartnerError::Throttled {
            retry_after_secs: 2,
        };
        assert!(err.to_string().contains("2s"));
    }
}
