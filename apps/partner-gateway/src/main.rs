//! Partner Gateway Binary
//!
//! Starts the partner gateway HTTP service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin partner-gateway
//! ```
//!
//! # Environment Variables
//!
//! ## Required (while `USE_PARTNER_API` is enabled)
//! - `PARTNER_API_BASE`: Partner API base URL
//! - `PARTNER_API_USER`: Partner API login
//! - `PARTNER_API_PASSWORD`: Partner API password
//! - `EXNESS_PARTNER_ID`: The platform's broker partner identifier
//!
//! ## Optional
//! - `USE_PARTNER_API`: Call the partner API for affiliation checks (default: true)
//! - `DEMO_BYPASS`: Accept demo emails without an upstream check (default: false)
//! - `HTTP_PORT`: HTTP server port (default: 8080)
//! - `BIND_ADDRESS`: Bind address (default: 0.0.0.0)
//! - `PARTNER_API_TIMEOUT_SECS`: Upstream request timeout (default: 8)
//! - `PARTNER_API_MAX_RETRIES`: Retry budget for 429/5xx (default: 2)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use partner_gateway::config::GatewayConfig;
use partner_gateway::partner::PartnerClient;
use partner_gateway::server::{AffiliationPolicy, AppState, create_router};
use partner_gateway::StrategyAllocator;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting Partner Gateway");

    let config = GatewayConfig::from_env()?;
    log_config(&config);

    let client = PartnerClient::new(config.partner.clone())?;

    let state = AppState {
        affiliation: Arc::new(client),
        allocator: StrategyAllocator::with_settings(config.allocation.clone()),
        policy: AffiliationPolicy {
            use_partner_api: config.use_partner_api,
            demo_bypass: config.demo_bypass,
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let addr: SocketAddr =
        format!("{}:{}", config.server.bind_address, config.server.http_port).parse()?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /v1/validate-affiliation");
    tracing::info!("  POST /v1/recommend-strategies");
    tracing::info!("  POST /v1/position-size");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Partner gateway stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "partner_gateway=info"
                    .parse()
                    .expect("static directive 'partner_gateway=info' is valid"),
            ),
        )
        .init();
}

/// Log the parsed configuration (credentials debug-redact themselves).
fn log_config(config: &GatewayConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        use_partner_api = config.use_partner_api,
        demo_bypass = config.demo_bypass,
        partner_timeout_secs = config.partner.timeout.as_secs(),
        max_retries = config.partner.retry.max_attempts,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. Failure to install handlers
/// means the process could never respond to termination signals, so failing
/// fast at startup is the safer outcome.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
