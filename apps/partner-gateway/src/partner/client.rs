//! Partner API client with token lifecycle and bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};

use crate::config::PartnerApiSettings;

use super::api_types::{
    AffiliationRequest, AffiliationResponse, AffiliationResult, LoginRequest, LoginResponse,
    PartnerErrorResponse,
};
use super::error::PartnerError;
use super::retry::{self, ErrorCategory, ExponentialBackoff};
use super::token::TokenStore;

/// Default Retry-After applied when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);

/// Port for affiliation lookups, the seam between HTTP handlers and the
/// upstream client so handler tests can stub the partner API.
#[async_trait]
pub trait AffiliationPort: Send + Sync {
    /// Check whether an email is affiliated with the platform's partner ID.
    async fn check_affiliation(&self, email: &str) -> Result<AffiliationResult, PartnerError>;
}

/// HTTP client for the partner API.
///
/// Holds the token cache; all other state is per-call. The upstream
/// affiliation endpoint is read-only, so every retry here is safe.
#[derive(Debug)]
pub struct PartnerClient {
    http: Client,
    settings: PartnerApiSettings,
    tokens: TokenStore,
}

impl PartnerClient {
    /// Create a new client from settings.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` when credentials are empty, or
    /// `Network` when the underlying HTTP client cannot be built.
    pub fn new(settings: PartnerApiSettings) -> Result<Self, PartnerError> {
        if settings.credentials.login().is_empty() || settings.credentials.password().is_empty() {
            return Err(PartnerError::AuthenticationFailed);
        }

        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PartnerError::Network(e.to_string()))?;

        let tokens = TokenStore::new(settings.token_safety_window);

        Ok(Self {
            http,
            settings,
            tokens,
        })
    }

    /// Get a bearer token, reusing the cached one while it is fresh.
    pub async fn token(&self) -> Result<String, PartnerError> {
        if let Some(token) = self.tokens.fresh_token().await {
            return Ok(token);
        }
        self.login().await
    }

    /// Authenticate against `POST {base}/auth/` and cache the token.
    async fn login(&self) -> Result<String, PartnerError> {
        let url = format!("{}/auth/", self.settings.base_url);
        let body = LoginRequest {
            login: self.settings.credentials.login().to_string(),
            password: self.settings.credentials.password().to_string(),
        };

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e.without_url(), "Partner API login request failed");
                return Err(PartnerError::AuthenticationFailed);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Partner API login rejected");
            return Err(PartnerError::AuthenticationFailed);
        }

        let text = response.text().await.map_err(|e| {
            tracing::warn!(error = %e.without_url(), "Partner API login body unreadable");
            PartnerError::AuthenticationFailed
        })?;

        let parsed: LoginResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(error = %e, "Partner API login body unparseable");
            PartnerError::AuthenticationFailed
        })?;

        let lifetime = parsed
            .expires_in
            .map_or(self.settings.default_token_lifetime, Duration::from_secs);

        let token = parsed
            .into_token()
            .ok_or(PartnerError::AuthenticationFailed)?;

        self.tokens.store(token.clone(), lifetime).await;
        tracing::debug!(lifetime_secs = lifetime.as_secs(), "Partner API token cached");

        Ok(token)
    }

    /// Issue one authenticated affiliation request.
    async fn send_affiliation(
        &self,
        token: &str,
        email: &str,
    ) -> Result<reqwest::Response, PartnerError> {
        let url = format!("{}/partner/affiliation/", self.settings.base_url);
        self.http
            .post(&url)
            .header(AUTHORIZATION, format!("JWT {token}"))
            .json(&AffiliationRequest {
                email: email.to_string(),
            })
            .send()
            .await
            .map_err(PartnerError::from_transport)
    }

    /// Read the error body for logging, without leaking it to callers.
    async fn error_message(response: reqwest::Response) -> String {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<PartnerErrorResponse>(&body)
            .ok()
            .and_then(PartnerErrorResponse::into_message)
            .unwrap_or(body)
    }
}

#[async_trait]
impl AffiliationPort for PartnerClient {
    async fn check_affiliation(&self, email: &str) -> Result<AffiliationResult, PartnerError> {
        let email = normalize_email(email)?;

        let mut backoff = ExponentialBackoff::new(&self.settings.retry);
        let mut token_refreshed = false;
        let mut server_error_retried = false;

        loop {
            let token = self.token().await?;
            let response = self.send_affiliation(&token, &email).await?;
            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(PartnerError::from_transport)?;
                let parsed: AffiliationResponse = serde_json::from_str(&text)
                    .map_err(|e| PartnerError::MalformedResponse(e.to_string()))?;
                return Ok(AffiliationResult::from_response(
                    parsed,
                    &self.settings.partner_id,
                ));
            }

            if status == StatusCode::UNAUTHORIZED {
                // The cached token may have expired early; refresh it and
                // retry the whole call exactly once.
                if token_refreshed {
                    return Err(PartnerError::Unauthorized);
                }
                token_refreshed = true;
                self.tokens.invalidate().await;
                tracing::warn!("Partner API returned 401, refreshing token");
                continue;
            }

            match retry::categorize_status(status) {
                ErrorCategory::RateLimited => {
                    // Prefer the upstream Retry-After hint; fall back to
                    // exponential backoff from the configured base.
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(retry::parse_retry_after);

                    if let Some(delay) = backoff.next_backoff_with_hint(retry_after) {
                        tracing::warn!(
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempts(),
                            "Partner API rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(PartnerError::Throttled {
                        retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER).as_secs(),
                    });
                }
                ErrorCategory::Retryable => {
                    let message = Self::error_message(response).await;
                    if !server_error_retried
                        && let Some(delay) = backoff.next_backoff()
                    {
                        server_error_retried = true;
                        tracing::warn!(
                            status = status.as_u16(),
                            delay_ms = delay.as_millis(),
                            "Partner API server error, retrying once"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(status = status.as_u16(), message = %message, "Partner API server error");
                    return Err(PartnerError::Upstream {
                        status: status.as_u16(),
                        message,
                    });
                }
                ErrorCategory::NonRetryable => {
                    let message = Self::error_message(response).await;
                    tracing::warn!(status = status.as_u16(), message = %message, "Partner API rejected request");
                    return Err(PartnerError::Upstream {
                        status: status.as_u16(),
                        message,
                    });
                }
            }
        }
    }
}

/// Normalize an email for the affiliation lookup: trim, lower-case, and
/// validate the basic shape before anything goes upstream.
pub fn normalize_email(raw: &str) -> Result<String, PartnerError> {
    let email = raw.trim().to_lowercase();

    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });

    if !valid {
        return Err(PartnerError::InvalidEmail(email));
    }
    Ok(email)
}
