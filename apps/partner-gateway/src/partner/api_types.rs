//! Partner API request and response types.
//!
//! These types map directly to the partner API's REST format. The login
//! endpoint has shipped three different response shapes over time; token
//! extraction accepts all of them.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Types
// ============================================================================

/// Login request for `POST {base}/auth/`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Partner account login.
    pub login: String,
    /// Partner account password.
    pub password: String,
}

/// Login response from `POST {base}/auth/`.
///
/// The token has been observed under `token`, `access`, and `data.token`
/// depending on the API revision.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Token in the current response shape.
    #[serde(default)]
    pub token: Option<String>,
    /// Token in the OAuth-style response shape.
    #[serde(default)]
    pub access: Option<String>,
    /// Envelope used by the oldest response shape.
    #[serde(default)]
    pub data: Option<LoginData>,
    /// Token lifetime in seconds, when the API reports one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Nested payload of the enveloped login response shape.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    /// Token field inside the envelope.
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Extract the token from whichever response shape was returned.
    #[must_use]
    pub fn into_token(self) -> Option<String> {
        self.token
            .or(self.access)
            .or(self.data.and_then(|d| d.token))
            .filter(|t| !t.is_empty())
    }
}

// ============================================================================
// Affiliation Types
// ============================================================================

/// Affiliation request for `POST {base}/partner/affiliation/`.
#[derive(Debug, Clone, Serialize)]
pub struct AffiliationRequest {
    /// Normalized (trimmed, lower-cased) email address.
    pub email: String,
}

/// Affiliation response from the partner API.
#[derive(Debug, Clone, Deserialize)]
pub struct AffiliationResponse {
    /// Whether the email is linked to the partner ID.
    pub affiliation: bool,
    /// Trading account identifiers linked to the email.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Broker-side client identifier.
    #[serde(default)]
    pub client_uid: Option<String>,
}

/// Error response body from the partner API.
#[derive(Debug, Clone, Deserialize)]
pub struct PartnerErrorResponse {
    /// Error message from the API.
    #[serde(default)]
    pub message: Option<String>,
    /// Error detail in the alternative shape.
    #[serde(default)]
    pub detail: Option<String>,
}

impl PartnerErrorResponse {
    /// Best-effort human-readable message for logs.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.detail)
    }
}

// ============================================================================
// Normalized Result
// ============================================================================

/// Normalized, immutable projection of the affiliation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffiliationResult {
    /// Whether the email is affiliated with the partner ID.
    pub is_affiliated: bool,
    /// The partner ID the check ran against, when affiliated.
    pub partner_id: Option<String>,
    /// Broker-side client identifier, when affiliated.
    pub client_uid: Option<String>,
    /// Trading account identifiers linked to the email.
    pub accounts: Vec<String>,
}

impl AffiliationResult {
    /// Build the normalized result from an upstream response.
    #[must_use]
    pub fn from_response(response: AffiliationResponse, partner_id: &str) -> Self {
        if response.affiliation {
            Self {
                is_affiliated: true,
                partner_id: Some(partner_id.to_string()),
                client_uid: response.client_uid,
                accounts: response.accounts,
            }
        } else {
            Self {
                is_affiliated: false,
                partner_id: None,
                client_uid: None,
                accounts: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_from_flat_shape() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"token": "abc", "expires_in": 900}"#).unwrap();
        assert_eq!(response.expires_in, Some(900));
        assert_eq!(response.into_token(), Some("abc".to_string()));
    }

    #[test]
    fn token_from_access_shape() {
        let response: LoginResponse = serde_json::from_str(r#"{"access": "xyz"}"#).unwrap();
        assert_eq!(response.into_token(), Some("xyz".to_string()));
    }

    #[test]
    fn token_from_enveloped_shape() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"data": {"token": "nested"}}"#).unwrap();
        assert_eq!(response.into_token(), Some("nested".to_string()));
    }

    #[test]
    fn empty_token_is_rejected() {
        let response: LoginResponse = serde_json::from_str(r#"{"token": ""}"#).unwrap();
        assert!(response.into_token().is_none());
    }

    #[test]
    fn missing_token_is_none() {
        let response: LoginResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_token().is_none());
    }

    #[test]
    fn affiliated_result_carries_partner_id() {
        let response = AffiliationResponse {
            affiliation: true,
            accounts: vec!["10012345".to_string()],
            client_uid: Some("c-9f2".to_string()),
        };

        let result = AffiliationResult::from_response(response, "1100");
        assert!(result.is_affiliated);
        assert_eq!(result.partner_id.as_deref(), Some("1100"));
        assert_eq!(result.client_uid.as_deref(), Some("c-9f2"));
        assert_eq!(result.accounts, vec!["10012345".to_string()]);
    }

    #[test]
    fn unaffiliated_result_is_empty() {
        let response = AffiliationResponse {
            affiliation: false,
            accounts: vec!["should-be-dropped".to_string()],
            client_uid: Some("c-9f2".to_string()),
        };

        let result = AffiliationResult::from_response(response, "1100");
        assert!(!result.is_affiliated);
        assert!(result.partner_id.is_none());
        assert!(result.client_uid.is_none());
        assert!(result.accounts.is_empty());
    }
}
