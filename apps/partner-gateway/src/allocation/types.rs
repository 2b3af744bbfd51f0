//! Core types for strategy allocation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk bucket used to match investors to strategies.
///
/// Ordering matters: a strategy is compatible with an investor when the
/// strategy's band is less than or equal to the investor's band.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    /// Capital-preservation strategies.
    Conservative,
    /// Balanced strategies.
    Moderate,
    /// High-volatility strategies.
    Aggressive,
}

impl RiskBand {
    /// Derive the band from a 1-10 risk tolerance score.
    ///
    /// Scores are clamped into 1..=10 first: ≤3 conservative, 4-7 moderate,
    /// ≥8 aggressive.
    #[must_use]
    pub fn from_tolerance(tolerance: u8) -> Self {
        match tolerance.clamp(1, 10) {
            1..=3 => Self::Conservative,
            4..=7 => Self::Moderate,
            _ => Self::Aggressive,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Trading experience declared during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experience {
    /// Less than a year of trading.
    Beginner,
    /// One to three years.
    Intermediate,
    /// More than three years.
    Advanced,
}

/// Intended investment horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentHorizon {
    /// Under a year.
    Short,
    /// One to three years.
    Medium,
    /// Over three years.
    Long,
}

/// Investor profile collected by the onboarding wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorProfile {
    /// Risk tolerance score, 1 (lowest) to 10 (highest).
    pub risk_tolerance: u8,
    /// Capital the investor wants to allocate.
    pub total_investment: Decimal,
    /// Declared trading experience.
    pub experience: Experience,
    /// Intended investment horizon.
    pub investment_horizon: InvestmentHorizon,
}

/// A published copy-trading strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStrategy {
    /// Stable strategy identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Declared risk band.
    pub risk_band: RiskBand,
    /// Trailing monthly return, percent.
    pub monthly_return_pct: Decimal,
    /// Number of investors currently copying the strategy.
    pub copiers: u32,
}

/// A single recommended allocation.
///
/// Derived data, recomputed on every request; never persisted here.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAllocation {
    /// The recommended strategy.
    pub strategy: CopyStrategy,
    /// Capital to allocate to this strategy.
    pub suggested_amount: Decimal,
    /// Share of total investment, percent.
    pub percentage: Decimal,
    /// Human-readable rationale for the wizard UI.
    pub reason: String,
}
