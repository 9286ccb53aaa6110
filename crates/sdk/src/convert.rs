//! Unit/amount conversion through pool share ratios.
//!
//! Pool units grow against native amounts as interest accrues; the share
//! ratio is the current exchange rate between the two. Every result is
//! rounded to the ledger's submission scale, so converting back and forth
//! reproduces the input only to within one unit in the last place.

use bigdecimal::BigDecimal;

use crest_math::{checked_div, ensure_non_negative, round_for_submission};
use crest_types::{EngineResult, PoolState};

/// Native amount represented by a supply-unit balance.
pub fn supply_units_to_amount(units: &BigDecimal, pool: &PoolState) -> EngineResult<BigDecimal> {
    ensure_non_negative("supply_units", units)?;
    let amount = checked_div("supply_ratio", units, &pool.supply_ratio)?;
    Ok(round_for_submission(&amount))
}

/// Supply units required to represent a native amount.
pub fn amount_to_supply_units(amount: &BigDecimal, pool: &PoolState) -> EngineResult<BigDecimal> {
    ensure_non_negative("amount", amount)?;
    Ok(round_for_submission(&(amount * &pool.supply_ratio)))
}

/// Native amount owed for a debt-unit balance.
pub fn debt_units_to_amount(units: &BigDecimal, pool: &PoolState) -> EngineResult<BigDecimal> {
    ensure_non_negative("debt_units", units)?;
    let amount = checked_div("debt_ratio", units, &pool.debt_ratio)?;
    Ok(round_for_submission(&amount))
}

/// Debt units represented by a native amount.
pub fn amount_to_debt_units(amount: &BigDecimal, pool: &PoolState) -> EngineResult<BigDecimal> {
    ensure_non_negative("amount", amount)?;
    Ok(round_for_submission(&(amount * &pool.debt_ratio)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crest_types::VaultAggregatedState;

    fn pool(supply_ratio_units: i64, supply_virtual: i64) -> PoolState {
        PoolState::derive(
            "resource_a".into(),
            "cluster_a".into(),
            VaultAggregatedState {
                supply: BigDecimal::from(1000),
                supply_units: BigDecimal::from(supply_ratio_units),
                virtual_supply: BigDecimal::from(supply_virtual),
                debt: BigDecimal::from(100),
                debt_units: BigDecimal::from(300),
                virtual_debt: BigDecimal::from(200),
                vault_balance: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn supply_conversion_divides_by_the_ratio() {
        // ratio 2: 100 units are worth 50 native
        let pool = pool(1000, 500);
        assert_eq!(
            supply_units_to_amount(&BigDecimal::from(100), &pool).unwrap(),
            BigDecimal::from(50).with_scale(18)
        );
        assert_eq!(
            amount_to_supply_units(&BigDecimal::from(50), &pool).unwrap(),
            BigDecimal::from(100).with_scale(18)
        );
    }

    #[test]
    fn debt_conversion_uses_the_debt_ratio() {
        // debt ratio 1.5
        let pool = pool(1000, 500);
        assert_eq!(
            debt_units_to_amount(&BigDecimal::from(30), &pool).unwrap(),
            BigDecimal::from(20).with_scale(18)
        );
        assert_eq!(
            amount_to_debt_units(&BigDecimal::from(20), &pool).unwrap(),
            BigDecimal::from(30).with_scale(18)
        );
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let pool = pool(1000, 500);
        assert!(supply_units_to_amount(&BigDecimal::from(-1), &pool).is_err());
        assert!(amount_to_debt_units(&BigDecimal::from(-1), &pool).is_err());
    }

    #[test]
    fn results_carry_the_submission_scale() {
        // ratio 3: 1/3 does not terminate; output must be rounded to 18
        // fractional digits
        let pool = pool(1500, 500);
        let amount = supply_units_to_amount(&BigDecimal::from(1), &pool).unwrap();
        assert_eq!(
            amount,
            "0.333333333333333333".parse::<BigDecimal>().unwrap()
        );
    }
}
