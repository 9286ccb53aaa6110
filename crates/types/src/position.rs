//! Position holdings and portfolio-level risk metrics.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::ResourceAddress;

/// Authoritative unit holdings for one user, keyed by asset. Sourced
/// externally (account metadata); the engine converts them to native
/// amounts through fresh pool state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBalances {
    pub supplied_units: BTreeMap<ResourceAddress, BigDecimal>,
    pub debt_units: BTreeMap<ResourceAddress, BigDecimal>,
}

/// One priced holding fed into the health calculator: a native amount plus
/// the asset's quoted APR (percentage).
#[derive(Debug, Clone)]
pub struct Holding {
    pub resource: ResourceAddress,
    pub amount: BigDecimal,
    pub apr: BigDecimal,
}

/// Portfolio health ratio with its two sentinel cases kept distinct: an
/// empty position is not the same thing as an infinitely healthy one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthRatio {
    /// Nothing supplied, nothing borrowed.
    NoPosition,
    /// Debt fully cleared; any supply is safe.
    NoDebt,
    /// `total_supplied_value / total_debt_value`.
    Ratio(BigDecimal),
}

impl HealthRatio {
    /// Whether a finite ratio sits below the given floor. The sentinels
    /// are never below any floor.
    pub fn is_below(&self, floor: &BigDecimal) -> bool {
        match self {
            HealthRatio::Ratio(ratio) => ratio < floor,
            HealthRatio::NoPosition | HealthRatio::NoDebt => false,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, HealthRatio::Ratio(_))
    }
}

/// Three-tier risk label driven by borrow power used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Safe,
    Moderate,
    High,
}

/// Aggregated portfolio risk metrics. All values are in the common pricing
/// unit; APRs are percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub total_supplied_value: BigDecimal,
    pub total_debt_value: BigDecimal,
    pub health_ratio: HealthRatio,
    pub net_worth: BigDecimal,
    pub weighted_supply_apr: BigDecimal,
    pub weighted_borrow_apr: BigDecimal,
    pub net_apr: BigDecimal,
    /// Share of the safe borrowing envelope consumed, in percent. Zero
    /// exactly when there is no debt; never negative.
    pub borrow_power_used_pct: BigDecimal,
    pub risk_tier: RiskTier,
}

impl HealthSnapshot {
    /// Snapshot of an empty portfolio.
    pub fn empty() -> Self {
        Self {
            total_supplied_value: BigDecimal::zero(),
            total_debt_value: BigDecimal::zero(),
            health_ratio: HealthRatio::NoPosition,
            net_worth: BigDecimal::zero(),
            weighted_supply_apr: BigDecimal::zero(),
            weighted_borrow_apr: BigDecimal::zero(),
            net_apr: BigDecimal::zero(),
            borrow_power_used_pct: BigDecimal::zero(),
            risk_tier: RiskTier::Safe,
        }
    }
}
