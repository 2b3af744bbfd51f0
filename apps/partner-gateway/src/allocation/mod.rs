//! Copy-Trading Strategy Allocation
//!
//! Maps an investor profile to a ranked, weighted subset of published
//! strategies. Pure domain logic: no I/O and no shared state.

mod allocator;
mod types;

pub use allocator::StrategyAllocator;
pub use types::{
    CopyStrategy, Experience, InvestmentHorizon, InvestorProfile, RiskBand, StrategyAllocation,
};
