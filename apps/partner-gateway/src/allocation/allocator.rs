//! Proportional capital allocation across risk-compatible strategies.

use rust_decimal::Decimal;

use crate::config::AllocationSettings;

use super::types::{CopyStrategy, InvestorProfile, RiskBand, StrategyAllocation};

/// Strategy allocator implementing deterministic proportional allocation.
///
/// Compatible strategies are weighted inversely to their risk band and the
/// investment is distributed proportionally, with a hard cap on any single
/// strategy's share. Capped excess is redistributed across the remaining
/// strategies; when everything is capped the remainder stays unallocated, so
/// the percentage sum never exceeds 100.
#[derive(Debug, Clone, Default)]
pub struct StrategyAllocator {
    settings: AllocationSettings,
}

impl StrategyAllocator {
    /// Create an allocator with custom settings.
    #[must_use]
    pub const fn with_settings(settings: AllocationSettings) -> Self {
        Self { settings }
    }

    /// Recommend a weighted subset of `strategies` for `profile`.
    ///
    /// Pure function: no I/O, no shared state. Zero compatible strategies
    /// (or a non-positive investment) yields an empty vector, not an error.
    #[must_use]
    pub fn recommend(
        &self,
        profile: &InvestorProfile,
        strategies: &[CopyStrategy],
    ) -> Vec<StrategyAllocation> {
        if profile.total_investment <= Decimal::ZERO {
            return Vec::new();
        }

        let band = RiskBand::from_tolerance(profile.risk_tolerance);

        let mut compatible: Vec<&CopyStrategy> = strategies
            .iter()
            .filter(|s| s.risk_band <= band)
            .collect();
        if compatible.is_empty() {
            return Vec::new();
        }

        // Deterministic order: lowest-risk first, then by id.
        compatible.sort_by(|a, b| (a.risk_band, &a.id).cmp(&(b.risk_band, &b.id)));

        let shares = self.distribute(&compatible);

        compatible
            .into_iter()
            .zip(shares)
            .filter(|(_, (pct, _))| *pct > Decimal::ZERO)
            .map(|(strategy, (pct, capped))| {
                let percentage = pct.trunc_with_scale(2);
                let suggested_amount =
                    (profile.total_investment * percentage / Decimal::ONE_HUNDRED)
                        .trunc_with_scale(2);
                StrategyAllocation {
                    strategy: strategy.clone(),
                    suggested_amount,
                    percentage,
                    reason: self.reason(strategy, band, capped),
                }
            })
            .collect()
    }

    /// Distribute 100% across strategies by inverse-risk weight, capping each
    /// share and redistributing the excess until no share exceeds the cap.
    ///
    /// Returns `(percentage, was_capped)` per strategy, in input order.
    fn distribute(&self, strategies: &[&CopyStrategy]) -> Vec<(Decimal, bool)> {
        let cap = self.settings.max_share_pct;
        let mut shares: Vec<(Decimal, bool)> = vec![(Decimal::ZERO, false); strategies.len()];
        let mut open: Vec<usize> = (0..strategies.len()).collect();
        let mut remaining = Decimal::ONE_HUNDRED;

        while !open.is_empty() && remaining > Decimal::ZERO {
            let total_weight: Decimal = open
                .iter()
                .map(|&i| inverse_risk_weight(strategies[i].risk_band))
                .sum();

            let mut overflowed = Vec::new();
            for &i in &open {
                let weight = inverse_risk_weight(strategies[i].risk_band);
                let share = remaining * weight / total_weight;
                if share > cap {
                    overflowed.push(i);
                } else {
                    shares[i].0 = share;
                }
            }

            if overflowed.is_empty() {
                break;
            }

            // Fix overflowing strategies at the cap and re-run the
            // proportional split over what is left.
            for &i in &overflowed {
                shares[i] = (cap, true);
                remaining -= cap;
            }
            open.retain(|i| !overflowed.contains(i));
            for &i in &open {
                shares[i].0 = Decimal::ZERO;
            }
        }

        shares
    }

    fn reason(&self, strategy: &CopyStrategy, band: RiskBand, capped: bool) -> String {
        if capped {
            format!(
                "{} strategy capped at {}% to preserve diversification",
                strategy.risk_band, self.settings.max_share_pct
            )
        } else {
            format!(
                "{} strategy compatible with your {} profile, weighted toward lower risk",
                strategy.risk_band, band
            )
        }
    }
}

/// Lower-risk strategies carry more weight in the proportional split.
fn inverse_risk_weight(band: RiskBand) -> Decimal {
    match band {
        RiskBand::Conservative => Decimal::from(3u8),
        RiskBand::Moderate => Decimal::from(2u8),
        RiskBand::Aggressive => Decimal::ONE,
    }
}
