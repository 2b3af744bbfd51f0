// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Partner Gateway - Rust Core Library
//!
//! Backend service for the trading-education platform:
//!
//! - `partner`: broker partner API client with token lifecycle (cached
//!   bearer token, expiry tracking) and bounded retries with backoff
//! - `allocation`: pure copy-trading strategy allocator matching investor
//!   risk profiles to published strategies
//! - `calculators`: trade-risk arithmetic (position size, margin, P&L)
//! - `server`: axum HTTP surface consumed by the platform frontend
//! - `config`: environment-driven configuration resolved once at startup
//! - `error`: typed error taxonomy with stable codes and HTTP mapping

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Strategy allocation domain logic.
pub mod allocation;

/// Trade-risk calculators.
pub mod calculators;

/// Environment-driven configuration.
pub mod config;

/// Gateway error taxonomy.
pub mod error;

/// Partner API client.
pub mod partner;

/// HTTP server.
pub mod server;

// Re-exports for the binary and integration tests
pub use allocation::{
    CopyStrategy, Experience, InvestmentHorizon, InvestorProfile, RiskBand, StrategyAllocation,
    StrategyAllocator,
};
pub use config::{ConfigError, GatewayConfig};
pub use error::{ErrorCode, GatewayError};
pub use partner::{AffiliationPort, AffiliationResult, PartnerClient, PartnerError};
pub use server::{AffiliationPolicy, AppState, create_router};
