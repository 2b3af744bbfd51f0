//! Trade-risk calculators.
//!
//! Pure arithmetic used by the position-size endpoint and the academy
//! calculators: risk amount, lot size, pip value, margin, and P&L. All money
//! math runs in `rust_decimal`; lot sizes round down to the broker's 0.01
//! step so a trader is never sized above their declared risk.

use rust_decimal::Decimal;
use thiserror::Error;

/// Trade direction for P&L calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Long position: profits when price rises.
    Buy,
    /// Short position: profits when price falls.
    Sell,
}

/// Errors from calculator input validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalculatorError {
    /// An input that must be positive was zero or negative.
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    /// Risk percentage outside the sane range.
    #[error("risk percent must be between 0 and 100")]
    RiskPercentOutOfRange,
}

/// Capital at risk for a trade: `balance * risk_pct / 100`.
pub fn risk_amount(balance: Decimal, risk_pct: Decimal) -> Result<Decimal, CalculatorError> {
    if balance <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("balance"));
    }
    if risk_pct <= Decimal::ZERO || risk_pct > Decimal::ONE_HUNDRED {
        return Err(CalculatorError::RiskPercentOutOfRange);
    }
    Ok(balance * risk_pct / Decimal::ONE_HUNDRED)
}

/// Lot size that keeps the stop-loss inside the risk amount, rounded down to
/// 0.01-lot steps.
pub fn lot_size(
    risk_amount: Decimal,
    stop_loss_pips: Decimal,
    pip_value_per_lot: Decimal,
) -> Result<Decimal, CalculatorError> {
    if risk_amount <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("risk amount"));
    }
    if stop_loss_pips <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("stop-loss pips"));
    }
    if pip_value_per_lot <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("pip value"));
    }

    let lots = risk_amount / (stop_loss_pips * pip_value_per_lot);
    Ok(lots.trunc_with_scale(2))
}

/// Monetary value of one pip for a position.
pub fn pip_value(
    lots: Decimal,
    contract_size: Decimal,
    pip_size: Decimal,
) -> Result<Decimal, CalculatorError> {
    if lots <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("lots"));
    }
    if contract_size <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("contract size"));
    }
    if pip_size <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("pip size"));
    }
    Ok(lots * contract_size * pip_size)
}

/// Margin required to open a position at the given leverage.
pub fn required_margin(
    lots: Decimal,
    contract_size: Decimal,
    price: Decimal,
    leverage: Decimal,
) -> Result<Decimal, CalculatorError> {
    if lots <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("lots"));
    }
    if contract_size <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("contract size"));
    }
    if price <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("price"));
    }
    if leverage <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("leverage"));
    }
    Ok(lots * contract_size * price / leverage)
}

/// Direction-aware P&L between entry and exit.
pub fn profit_loss(
    direction: Direction,
    entry: Decimal,
    exit: Decimal,
    pip_size: Decimal,
    pip_value_per_lot: Decimal,
    lots: Decimal,
) -> Result<Decimal, CalculatorError> {
    if entry <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("entry price"));
    }
    if exit <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("exit price"));
    }
    if pip_size <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("pip size"));
    }
    if pip_value_per_lot <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("pip value"));
    }
    if lots <= Decimal::ZERO {
        return Err(CalculatorError::NonPositive("lots"));
    }

    let pips = match direction {
        Direction::Buy => (exit - entry) / pip_size,
        Direction::Sell => (entry - exit) / pip_size,
    };
    Ok(pips * pip_value_per_lot * lots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn risk_amount_anchor_case() {
        // Representative case from the platform's existing suite.
        let risk = risk_amount(dec!(10000), dec!(2)).unwrap();
        assert_eq!(risk, dec!(200));
    }

    #[test]
    fn lot_size_anchor_case() {
        let risk = risk_amount(dec!(10000), dec!(2)).unwrap();
        let lots = lot_size(risk, dec!(50), dec!(10)).unwrap();
        assert_eq!(lots, dec!(0.4));
    }

    #[test]
    fn lot_size_rounds_down_to_broker_step() {
        // 150 / (43 * 10) = 0.3488... -> 0.34, never 0.35.
        let lots = lot_size(dec!(150), dec!(43), dec!(10)).unwrap();
        assert_eq!(lots, dec!(0.34));
    }

    #[test]
    fn pip_value_standard_lot() {
        // One standard EURUSD lot: 100_000 * 0.0001 = 10 per pip.
        let value = pip_value(dec!(1), dec!(100000), dec!(0.0001)).unwrap();
        assert_eq!(value, dec!(10.0000));
    }

    #[test]
    fn required_margin_at_leverage() {
        // 0.5 lots EURUSD at 1.1000 with 1:100 leverage.
        let margin = required_margin(dec!(0.5), dec!(100000), dec!(1.1), dec!(100)).unwrap();
        assert_eq!(margin, dec!(550));
    }

    #[test]
    fn profit_loss_long_winner() {
        let pnl = profit_loss(
            Direction::Buy,
            dec!(1.1000),
            dec!(1.1050),
            dec!(0.0001),
            dec!(10),
            dec!(1),
        )
        .unwrap();
        assert_eq!(pnl, dec!(500));
    }

    #[test]
    fn profit_loss_short_loser() {
        let pnl = profit_loss(
            Direction::Sell,
            dec!(1.1000),
            dec!(1.1050),
            dec!(0.0001),
            dec!(10),
            dec!(1),
        )
        .unwrap();
        assert_eq!(pnl, dec!(-500));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(risk_amount(dec!(0), dec!(2)).is_err());
        assert!(risk_amount(dec!(10000), dec!(0)).is_err());
        assert!(risk_amount(dec!(10000), dec!(101)).is_err());
        assert!(lot_size(dec!(200), dec!(0), dec!(10)).is_err());
        assert!(pip_value(dec!(1), dec!(100000), dec!(0)).is_err());
        assert!(required_margin(dec!(1), dec!(100000), dec!(1.1), dec!(0)).is_err());
    }
}
