//! Protocol risk policy.
//!
//! These are policy constants, not engine logic: the minimum safe health
//! ratio and the borrow-power tier thresholds come from protocol
//! governance and are carried as configuration.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::position::RiskTier;

/// Risk policy applied by the health calculator and the mutation previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// A mutating operation must not drive a finite health ratio below
    /// this floor, except when debt is fully cleared.
    pub min_health_ratio: BigDecimal,
    /// Borrow power used at or above this percentage is labelled moderate.
    pub moderate_risk_pct: BigDecimal,
    /// Borrow power used at or above this percentage is labelled high.
    pub high_risk_pct: BigDecimal,
    /// Slippage tolerance applied when the caller does not pick one.
    pub default_slippage_fraction: BigDecimal,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            // 1.5
            min_health_ratio: BigDecimal::new(BigInt::from(15), 1),
            moderate_risk_pct: BigDecimal::from(50),
            high_risk_pct: BigDecimal::from(80),
            // 0.5%
            default_slippage_fraction: BigDecimal::new(BigInt::from(5), 3),
        }
    }
}

impl RiskPolicy {
    /// Map borrow power used to the three-tier risk label.
    pub fn risk_tier(&self, borrow_power_used_pct: &BigDecimal) -> RiskTier {
        if *borrow_power_used_pct >= self.high_risk_pct {
            RiskTier::High
        } else if *borrow_power_used_pct >= self.moderate_risk_pct {
            RiskTier::Moderate
        } else {
            RiskTier::Safe
        }
    }

    /// Maximum debt value the policy allows against the given supplied
    /// value (the debt at which health sits exactly on the floor).
    pub fn max_borrowable_debt(&self, total_supplied_value: &BigDecimal) -> BigDecimal {
        if self.min_health_ratio <= BigDecimal::zero() {
            return BigDecimal::zero();
        }
        (total_supplied_value / &self.min_health_ratio).with_prec(crate::constants::WORKING_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_protocol_constants() {
        let policy = RiskPolicy::default();
        assert_eq!(policy.min_health_ratio, "1.5".parse::<BigDecimal>().unwrap());
        assert_eq!(policy.moderate_risk_pct, BigDecimal::from(50));
        assert_eq!(policy.high_risk_pct, BigDecimal::from(80));
        assert_eq!(policy.default_slippage_fraction, "0.005".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn tiers_switch_at_the_thresholds() {
        let policy = RiskPolicy::default();
        assert_eq!(policy.risk_tier(&BigDecimal::from(0)), RiskTier::Safe);
        assert_eq!(policy.risk_tier(&BigDecimal::from(49)), RiskTier::Safe);
        assert_eq!(policy.risk_tier(&BigDecimal::from(50)), RiskTier::Moderate);
        assert_eq!(policy.risk_tier(&BigDecimal::from(80)), RiskTier::High);
        assert_eq!(policy.risk_tier(&BigDecimal::from(250)), RiskTier::High);
    }

    #[test]
    fn max_borrowable_debt_sits_on_the_health_floor() {
        let policy = RiskPolicy::default();
        assert_eq!(
            policy.max_borrowable_debt(&BigDecimal::from(150)),
            BigDecimal::from(100)
        );
    }
}
