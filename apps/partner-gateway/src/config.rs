//! Gateway Configuration Settings
//!
//! Configuration for the partner gateway, loaded from environment variables
//! once at startup. A `.env` file in the working directory (or any ancestor)
//! is honored via `dotenvy` before this module reads the environment.

use std::time::Duration;

use rust_decimal::Decimal;

/// Partner API credentials.
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(login: String, password: String) -> Self {
        Self { login, password }
    }

    /// Get the partner API login.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Get the partner API password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Upstream partner API settings.
#[derive(Debug, Clone)]
pub struct PartnerApiSettings {
    /// Base URL of the partner API (no trailing slash).
    pub base_url: String,
    /// Login credentials for the token endpoint.
    pub credentials: Credentials,
    /// The platform's broker partner identifier.
    pub partner_id: String,
    /// Client-side request timeout (requests abort after this).
    pub timeout: Duration,
    /// Reuse a cached token only while it is at least this far from expiry.
    pub token_safety_window: Duration,
    /// Token lifetime assumed when the login response carries no `expires_in`.
    pub default_token_lifetime: Duration,
    /// Retry tuning for rate-limited and failed upstream calls.
    pub retry: RetrySettings,
}

/// Retry tuning for upstream calls.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Maximum retry attempts for 429/5xx responses.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Upper bound of the random jitter added to each backoff.
    pub jitter: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: Duration::from_millis(300),
        }
    }
}

/// Server bind settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP server port.
    pub http_port: u16,
    /// Bind address.
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8080,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Strategy allocation tuning.
#[derive(Debug, Clone)]
pub struct AllocationSettings {
    /// Hard cap on the percentage any single strategy may receive.
    pub max_share_pct: Decimal,
    /// Diversification target (not a floor): preferred strategy count.
    pub target_strategies: usize,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            max_share_pct: Decimal::new(40, 0),
            target_strategies: 3,
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream partner API settings.
    pub partner: PartnerApiSettings,
    /// Whether affiliation checks actually call the partner API.
    pub use_partner_api: bool,
    /// Whether demo emails bypass the affiliation check.
    pub demo_bypass: bool,
    /// Server bind settings.
    pub server: ServerSettings,
    /// Strategy allocation tuning.
    pub allocation: AllocationSettings,
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// empty. Partner credentials are only required while `USE_PARTNER_API`
    /// is enabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        let use_partner_api = parse_env_bool("USE_PARTNER_API", true);
        let demo_bypass = parse_env_bool("DEMO_BYPASS", false);

        let (base_url, credentials, partner_id) = if use_partner_api {
            (
                require_env("PARTNER_API_BASE")?,
                Credentials::new(
                    require_env("PARTNER_API_USER")?,
                    require_env("PARTNER_API_PASSWORD")?,
                ),
                require_env("EXNESS_PARTNER_ID")?,
            )
        } else {
            (
                std::env::var("PARTNER_API_BASE").unwrap_or_default(),
                Credentials::new(
                    std::env::var("PARTNER_API_USER").unwrap_or_default(),
                    std::env::var("PARTNER_API_PASSWORD").unwrap_or_default(),
                ),
                std::env::var("EXNESS_PARTNER_ID").unwrap_or_default(),
            )
        };

        let partner = PartnerApiSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            partner_id,
            timeout: parse_env_duration_secs("PARTNER_API_TIMEOUT_SECS", Duration::from_secs(8)),
            token_safety_window: parse_env_duration_secs(
                "PARTNER_TOKEN_SAFETY_WINDOW_SECS",
                Duration::from_secs(120),
            ),
            default_token_lifetime: parse_env_duration_secs(
                "PARTNER_TOKEN_LIFETIME_SECS",
                Duration::from_secs(600),
            ),
            retry: RetrySettings {
                max_attempts: parse_env_u32(
                    "PARTNER_API_MAX_RETRIES",
                    RetrySettings::default().max_attempts,
                ),
                initial_backoff: parse_env_duration_millis(
                    "PARTNER_API_BACKOFF_INITIAL_MS",
                    RetrySettings::default().initial_backoff,
                ),
                ..RetrySettings::default()
            },
        };

        let server = ServerSettings {
            http_port: parse_env_u16("HTTP_PORT", ServerSettings::default().http_port),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| ServerSettings::default().bind_address),
        };

        Ok(Self {
            partner,
            use_partner_api,
            demo_bypass,
            server,
            allocation: AllocationSettings::default(),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    let value =
        std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).map_or(default, |v| {
        !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off")
    })
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_redacted_debug() {
        let creds = Credentials::new("partner-login".to_string(), "hunter2".to_string());
        let debug = format!("{creds:?}");
        assert!(!debug.contains("partner-login"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn retry_settings_defaults() {
        let retry = RetrySettings::default();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.initial_backoff, Duration::from_secs(2));
        assert_eq!(retry.max_backoff, Duration::from_secs(30));
        assert_eq!(retry.jitter, Duration::from_millis(300));
    }

    #[test]
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.http_port, 8080);
        assert_eq!(settings.bind_address, "0.0.0.0");
    }

    #[test]
    fn allocation_settings_defaults() {
        let settings = AllocationSettings::default();
        assert_eq!(settings.max_share_pct, Decimal::new(40, 0));
        assert_eq!(settings.target_strategies, 3);
    }
}
