//! Partner API Client
//!
//! Integration with the broker partner API:
//! - Token lifecycle with a cached, expiry-tracked bearer token
//! - Affiliation lookups with bounded retries and backoff
//! - Typed error taxonomy for the HTTP surface

mod api_types;
mod client;
mod error;
mod retry;
mod token;

pub use api_types::AffiliationResult;
pub use client::{AffiliationPort, PartnerClient, normalize_email};
pub use error::PartnerError;
pub use retry::{ErrorCategory, ExponentialBackoff, categorize_status, parse_retry_after};
pub use token::{CachedToken, Clock, SystemClock, TokenStore};
