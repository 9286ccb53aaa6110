//! Position health calculator.
//!
//! Pure over its inputs: priced holdings in, a [`HealthSnapshot`] out.
//! Every held asset must be priced; a missing price aborts the whole
//! computation rather than silently contributing zero.

use bigdecimal::{BigDecimal, Zero};
use std::collections::BTreeMap;

use crest_math::{checked_div, ensure_non_negative};
use crest_types::constants::WORKING_PRECISION;
use crest_types::{
    EngineError, EngineResult, HealthRatio, HealthSnapshot, Holding, ResourceAddress, RiskPolicy,
};

/// Oracle prices keyed by asset, in the common pricing unit.
pub type PriceMap = BTreeMap<ResourceAddress, BigDecimal>;

/// Compute the full risk snapshot for a position.
pub fn compute_position_health(
    supplied: &[Holding],
    borrowed: &[Holding],
    prices: &PriceMap,
    policy: &RiskPolicy,
) -> EngineResult<HealthSnapshot> {
    let (total_supplied_value, supply_apr_weighted) = value_side("supplied", supplied, prices)?;
    let (total_debt_value, borrow_apr_weighted) = value_side("borrowed", borrowed, prices)?;

    let health_ratio = if total_supplied_value <= BigDecimal::zero()
        && total_debt_value <= BigDecimal::zero()
    {
        HealthRatio::NoPosition
    } else if total_debt_value <= BigDecimal::zero() {
        HealthRatio::NoDebt
    } else {
        HealthRatio::Ratio(checked_div(
            "total_debt_value",
            &total_supplied_value,
            &total_debt_value,
        )?)
    };

    let net_worth = &total_supplied_value - &total_debt_value;

    let weighted_supply_apr = weighted_apr(&supply_apr_weighted, &total_supplied_value);
    let weighted_borrow_apr = weighted_apr(&borrow_apr_weighted, &total_debt_value);
    let net_apr = net_apr(
        &weighted_supply_apr,
        &total_supplied_value,
        &weighted_borrow_apr,
        &total_debt_value,
    );

    let borrow_power_used_pct = borrow_power_used(&total_supplied_value, &total_debt_value, policy);
    let risk_tier = policy.risk_tier(&borrow_power_used_pct);

    Ok(HealthSnapshot {
        total_supplied_value,
        total_debt_value,
        health_ratio,
        net_worth,
        weighted_supply_apr,
        weighted_borrow_apr,
        net_apr,
        borrow_power_used_pct,
        risk_tier,
    })
}

/// Health ratio after withdrawing the given value of collateral, with debt
/// unchanged. Used to preview a withdrawal against the policy floor.
pub fn projected_health_after_withdraw(
    snapshot: &HealthSnapshot,
    withdraw_value: &BigDecimal,
) -> EngineResult<HealthRatio> {
    ensure_non_negative("withdraw_value", withdraw_value)?;
    let new_supplied = &snapshot.total_supplied_value - withdraw_value;
    if snapshot.total_debt_value <= BigDecimal::zero() {
        return Ok(HealthRatio::NoDebt);
    }
    if new_supplied <= BigDecimal::zero() {
        return Ok(HealthRatio::Ratio(BigDecimal::zero()));
    }
    Ok(HealthRatio::Ratio(checked_div(
        "total_debt_value",
        &new_supplied,
        &snapshot.total_debt_value,
    )?))
}

/// Health ratio after repaying the given value of debt, with collateral
/// unchanged.
pub fn projected_health_after_repay(
    snapshot: &HealthSnapshot,
    repay_value: &BigDecimal,
) -> EngineResult<HealthRatio> {
    ensure_non_negative("repay_value", repay_value)?;
    let new_debt = &snapshot.total_debt_value - repay_value;
    if new_debt <= BigDecimal::zero() {
        return Ok(HealthRatio::NoDebt);
    }
    Ok(HealthRatio::Ratio(checked_div(
        "total_debt_value",
        &snapshot.total_supplied_value,
        &new_debt,
    )?))
}

/// Sum of values and of value-weighted APR contributions for one side of
/// the position.
fn value_side(
    side: &str,
    holdings: &[Holding],
    prices: &PriceMap,
) -> EngineResult<(BigDecimal, BigDecimal)> {
    let mut total_value = BigDecimal::zero();
    let mut apr_weighted = BigDecimal::zero();

    for holding in holdings {
        ensure_non_negative(side, &holding.amount)?;
        let price = prices
            .get(&holding.resource)
            .ok_or_else(|| EngineError::PriceUnavailable(holding.resource.to_string()))?;
        let value = (&holding.amount * price).with_prec(WORKING_PRECISION);
        apr_weighted += (&value * &holding.apr).with_prec(WORKING_PRECISION);
        total_value += value;
    }

    Ok((total_value, apr_weighted))
}

fn weighted_apr(apr_weighted: &BigDecimal, total_value: &BigDecimal) -> BigDecimal {
    if *total_value <= BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        (apr_weighted / total_value).with_prec(WORKING_PRECISION)
    }
}

/// Net APR over the larger of the two sides, so leverage does not inflate
/// the figure.
fn net_apr(
    supply_apr: &BigDecimal,
    supplied_value: &BigDecimal,
    borrow_apr: &BigDecimal,
    debt_value: &BigDecimal,
) -> BigDecimal {
    let base = supplied_value.clone().max(debt_value.clone());
    if base <= BigDecimal::zero() {
        return BigDecimal::zero();
    }
    let earned = (supply_apr * supplied_value).with_prec(WORKING_PRECISION);
    let paid = (borrow_apr * debt_value).with_prec(WORKING_PRECISION);
    ((earned - paid) / base).with_prec(WORKING_PRECISION)
}

/// Share of the safe borrowing envelope consumed, in percent. Saturates at
/// 10000% when debt exists against no collateral at all.
fn borrow_power_used(
    supplied_value: &BigDecimal,
    debt_value: &BigDecimal,
    policy: &RiskPolicy,
) -> BigDecimal {
    if *debt_value <= BigDecimal::zero() {
        return BigDecimal::zero();
    }
    let max_borrowable = policy.max_borrowable_debt(supplied_value);
    if max_borrowable <= BigDecimal::zero() {
        return BigDecimal::from(10_000);
    }
    ((debt_value / &max_borrowable) * BigDecimal::from(100)).with_prec(WORKING_PRECISION)
}
