//! Slippage-bounded quantity resolution for withdrawals and repayments.
//!
//! The pool's share ratio keeps moving between quote and execution, so the
//! engine submits an inflated quantity together with a bound the ledger
//! enforces. When the inflated quantity would cross the caller's whole
//! balance the request collapses to "close it out": the full balance goes
//! in and the bound is dropped, so a position can always be emptied exactly
//! without dust.

use bigdecimal::{BigDecimal, Zero};

use crest_math::{ensure_positive, round_for_submission, slippage_envelope};
use crest_types::{EngineError, EngineResult, PoolState};

use crate::convert::{amount_to_supply_units, debt_units_to_amount, supply_units_to_amount};

/// Resolved withdrawal quantities. `submit_units` are burned;
/// `requested_floor` is the minimum native amount the transaction must
/// return, or `None` when the whole unit balance is being redeemed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWithdrawal {
    pub submit_units: BigDecimal,
    pub requested_floor: Option<BigDecimal>,
}

/// Resolved repayment quantities. `submit_amount` is paid from the wallet;
/// `requested_ceiling` caps how much of it the ledger may take, or `None`
/// when the debt is being cleared in full.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRepayment {
    pub submit_amount: BigDecimal,
    pub requested_ceiling: Option<BigDecimal>,
}

/// Resolve the supply units to burn for a withdrawal of `requested_amount`
/// native, given the caller's unit balance and a slippage fraction.
pub fn resolve_withdraw_quantity(
    pool: &PoolState,
    requested_amount: &BigDecimal,
    unit_balance: &BigDecimal,
    slippage_fraction: &BigDecimal,
) -> EngineResult<ResolvedWithdrawal> {
    ensure_positive("requested_amount", requested_amount)?;
    let envelope = slippage_envelope(slippage_fraction)?;

    if *unit_balance <= BigDecimal::zero() {
        return Err(EngineError::insufficient_balance(
            pool.resource.to_string(),
            unit_balance.clone(),
            requested_amount.clone(),
        ));
    }

    let raw_units = amount_to_supply_units(requested_amount, pool)?;
    let inflated_units = round_for_submission(&(&raw_units * &envelope));

    if inflated_units >= *unit_balance {
        // Full redemption: burn everything, no floor.
        return Ok(ResolvedWithdrawal {
            submit_units: unit_balance.clone(),
            requested_floor: None,
        });
    }

    let submit_amount = supply_units_to_amount(&inflated_units, pool)?;
    let floor = requested_amount.clone().min(submit_amount);
    Ok(ResolvedWithdrawal {
        submit_units: inflated_units,
        requested_floor: Some(round_for_submission(&floor)),
    })
}

/// Resolve the native amount to submit for repaying `requested_amount` of
/// debt, given the caller's debt-unit balance and wallet balance.
pub fn resolve_repay_quantity(
    pool: &PoolState,
    requested_amount: &BigDecimal,
    debt_unit_balance: &BigDecimal,
    wallet_balance: &BigDecimal,
    slippage_fraction: &BigDecimal,
) -> EngineResult<ResolvedRepayment> {
    ensure_positive("requested_amount", requested_amount)?;
    let envelope = slippage_envelope(slippage_fraction)?;

    if *debt_unit_balance <= BigDecimal::zero() {
        return Err(EngineError::insufficient_balance(
            pool.resource.to_string(),
            debt_unit_balance.clone(),
            requested_amount.clone(),
        ));
    }
    if *wallet_balance <= BigDecimal::zero() {
        return Err(EngineError::insufficient_balance(
            pool.resource.to_string(),
            wallet_balance.clone(),
            requested_amount.clone(),
        ));
    }

    let owed_amount = debt_units_to_amount(debt_unit_balance, pool)?;
    let inflated_amount = round_for_submission(&(requested_amount * &envelope));

    // Never submit more than the wallet holds.
    let submit_amount = inflated_amount.clone().min(wallet_balance.clone());

    if inflated_amount >= owed_amount {
        // Full repayment: the ledger takes what is owed and returns the
        // change, so no ceiling is needed.
        return Ok(ResolvedRepayment {
            submit_amount,
            requested_ceiling: None,
        });
    }

    let ceiling = requested_amount.clone().min(owed_amount);
    Ok(ResolvedRepayment {
        submit_amount,
        requested_ceiling: Some(round_for_submission(&ceiling)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crest_types::VaultAggregatedState;

    // supply ratio 2, debt ratio 1
    fn pool() -> PoolState {
        PoolState::derive(
            "resource_a".into(),
            "cluster_a".into(),
            VaultAggregatedState {
                supply: BigDecimal::from(10_000),
                supply_units: BigDecimal::from(2000),
                virtual_supply: BigDecimal::from(1000),
                debt: BigDecimal::from(100),
                debt_units: BigDecimal::from(400),
                virtual_debt: BigDecimal::from(400),
                vault_balance: None,
            },
        )
        .unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn withdraw_at_the_balance_boundary_collapses_to_full_redemption() {
        // 50 native at ratio 2 needs 100 units; 0.5% slippage inflates to
        // 100.5, over the 100-unit balance, so the whole balance goes in
        // with no floor.
        let resolved = resolve_withdraw_quantity(
            &pool(),
            &BigDecimal::from(50),
            &BigDecimal::from(100),
            &dec("0.005"),
        )
        .unwrap();
        assert_eq!(resolved.submit_units, BigDecimal::from(100));
        assert_eq!(resolved.requested_floor, None);
    }

    #[test]
    fn partial_withdraw_keeps_the_requested_floor() {
        // 10 native needs 20 units, inflated to 20.1 out of 100
        let resolved = resolve_withdraw_quantity(
            &pool(),
            &BigDecimal::from(10),
            &BigDecimal::from(100),
            &dec("0.005"),
        )
        .unwrap();
        assert_eq!(resolved.submit_units, dec("20.1"));
        assert_eq!(
            resolved.requested_floor,
            Some(BigDecimal::from(10).with_scale(18))
        );
    }

    #[test]
    fn withdraw_never_submits_more_units_than_held() {
        let balance = BigDecimal::from(100);
        let resolved = resolve_withdraw_quantity(
            &pool(),
            &BigDecimal::from(49),
            &balance,
            &dec("0.05"),
        )
        .unwrap();
        assert!(resolved.submit_units <= balance);
    }

    #[test]
    fn withdraw_with_no_units_is_insufficient_balance() {
        let err = resolve_withdraw_quantity(
            &pool(),
            &BigDecimal::from(10),
            &BigDecimal::zero(),
            &dec("0.005"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    }

    #[test]
    fn repaying_the_full_debt_drops_the_ceiling() {
        // owed = 20 units / ratio 1 = 20; requesting 20 at 1% inflates to
        // 20.2 >= owed, so no ceiling; wallet capped at 20.15
        let resolved = resolve_repay_quantity(
            &pool(),
            &BigDecimal::from(20),
            &BigDecimal::from(20),
            &dec("20.15"),
            &dec("0.01"),
        )
        .unwrap();
        assert_eq!(resolved.submit_amount, dec("20.15"));
        assert_eq!(resolved.requested_ceiling, None);
    }

    #[test]
    fn partial_repay_keeps_the_requested_ceiling() {
        let resolved = resolve_repay_quantity(
            &pool(),
            &BigDecimal::from(5),
            &BigDecimal::from(20),
            &BigDecimal::from(100),
            &dec("0.01"),
        )
        .unwrap();
        assert_eq!(resolved.submit_amount, dec("5.05"));
        assert_eq!(
            resolved.requested_ceiling,
            Some(BigDecimal::from(5).with_scale(18))
        );
    }

    #[test]
    fn repay_without_debt_or_funds_is_insufficient_balance() {
        let err = resolve_repay_quantity(
            &pool(),
            &BigDecimal::from(5),
            &BigDecimal::zero(),
            &BigDecimal::from(100),
            &dec("0.01"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));

        let err = resolve_repay_quantity(
            &pool(),
            &BigDecimal::from(5),
            &BigDecimal::from(20),
            &BigDecimal::zero(),
            &dec("0.01"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    }

    #[test]
    fn non_positive_requests_are_rejected() {
        assert!(resolve_withdraw_quantity(
            &pool(),
            &BigDecimal::zero(),
            &BigDecimal::from(100),
            &dec("0.005"),
        )
        .is_err());
        assert!(resolve_repay_quantity(
            &pool(),
            &dec("-1"),
            &BigDecimal::from(20),
            &BigDecimal::from(100),
            &dec("0.01"),
        )
        .is_err());
    }
}
