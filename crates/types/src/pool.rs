//! Pool state and its derived ratios.

use bigdecimal::{BigDecimal, One, Zero};
use serde::{Deserialize, Serialize};

use crate::asset::{ClusterAddress, ResourceAddress};
use crate::constants::WORKING_PRECISION;
use crate::errors::{EngineError, EngineResult};

/// Raw aggregated vault state for one asset's pool, as reported by the
/// gateway. `vault_balance` is the authoritative on-chain liquidity when
/// the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultAggregatedState {
    pub supply: BigDecimal,
    pub supply_units: BigDecimal,
    pub virtual_supply: BigDecimal,
    pub debt: BigDecimal,
    pub debt_units: BigDecimal,
    pub virtual_debt: BigDecimal,
    pub vault_balance: Option<BigDecimal>,
}

/// Pool state for one collateral/debt asset, with derived ratios.
///
/// Read fresh on every accounting operation; display paths may serve a
/// copy up to the configured TTL old, transaction-amount derivation may
/// not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    pub resource: ResourceAddress,
    pub cluster: ClusterAddress,

    pub supply: BigDecimal,
    pub supply_units: BigDecimal,
    pub virtual_supply: BigDecimal,
    /// `supply_units / virtual_supply`, or exactly 1 when the virtual
    /// baseline is not positive. Always > 0.
    pub supply_ratio: BigDecimal,

    pub debt: BigDecimal,
    pub debt_units: BigDecimal,
    pub virtual_debt: BigDecimal,
    /// `debt_units / virtual_debt`, guarded the same way. Always > 0.
    pub debt_ratio: BigDecimal,

    /// Native units available for withdrawal/borrowing.
    pub liquidity: BigDecimal,
}

impl PoolState {
    /// Derive ratios and liquidity from raw aggregated vault state.
    pub fn derive(
        resource: ResourceAddress,
        cluster: ClusterAddress,
        raw: VaultAggregatedState,
    ) -> EngineResult<Self> {
        if raw.supply < BigDecimal::zero() || raw.debt < BigDecimal::zero() {
            return Err(EngineError::malformed(format!(
                "pool {resource} reports negative supply or debt"
            )));
        }

        let supply_ratio = share_ratio(&raw.supply_units, &raw.virtual_supply);
        let debt_ratio = share_ratio(&raw.debt_units, &raw.virtual_debt);

        if supply_ratio <= BigDecimal::zero() || debt_ratio <= BigDecimal::zero() {
            return Err(EngineError::malformed(format!(
                "pool {resource} has a non-positive share ratio"
            )));
        }

        let difference = &raw.supply - &raw.debt;
        let liquidity = match &raw.vault_balance {
            Some(vault) => vault.clone().max(difference),
            None => difference,
        };

        Ok(Self {
            resource,
            cluster,
            supply: raw.supply,
            supply_units: raw.supply_units,
            virtual_supply: raw.virtual_supply,
            supply_ratio,
            debt: raw.debt,
            debt_units: raw.debt_units,
            virtual_debt: raw.virtual_debt,
            debt_ratio,
            liquidity,
        })
    }
}

/// Units-per-virtual ratio with the degenerate-baseline guard: a virtual
/// baseline at or below zero pins the ratio to exactly 1.
fn share_ratio(units: &BigDecimal, virtual_baseline: &BigDecimal) -> BigDecimal {
    if *virtual_baseline <= BigDecimal::zero() {
        BigDecimal::one()
    } else {
        (units / virtual_baseline).with_prec(WORKING_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        supply: i64,
        supply_units: i64,
        virtual_supply: i64,
        debt: i64,
        debt_units: i64,
        virtual_debt: i64,
    ) -> VaultAggregatedState {
        VaultAggregatedState {
            supply: BigDecimal::from(supply),
            supply_units: BigDecimal::from(supply_units),
            virtual_supply: BigDecimal::from(virtual_supply),
            debt: BigDecimal::from(debt),
            debt_units: BigDecimal::from(debt_units),
            virtual_debt: BigDecimal::from(virtual_debt),
            vault_balance: None,
        }
    }

    fn derive(raw: VaultAggregatedState) -> EngineResult<PoolState> {
        PoolState::derive("resource_a".into(), "cluster_a".into(), raw)
    }

    #[test]
    fn ratios_follow_units_over_virtual() {
        let pool = derive(raw(1000, 1000, 500, 100, 300, 200)).unwrap();
        assert_eq!(pool.supply_ratio, BigDecimal::from(2));
        // 300 / 200
        assert_eq!(pool.debt_ratio, "1.5".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn non_positive_virtual_baseline_pins_ratio_to_one() {
        let pool = derive(raw(1000, 1000, 0, 100, 300, -5)).unwrap();
        assert_eq!(pool.supply_ratio, BigDecimal::one());
        assert_eq!(pool.debt_ratio, BigDecimal::one());
    }

    #[test]
    fn liquidity_prefers_the_larger_of_vault_and_difference() {
        let mut state = raw(1000, 1000, 500, 400, 400, 400);
        state.vault_balance = Some(BigDecimal::from(700));
        let pool = derive(state).unwrap();
        // vault 700 > supply - debt = 600
        assert_eq!(pool.liquidity, BigDecimal::from(700));

        let mut state = raw(1000, 1000, 500, 400, 400, 400);
        state.vault_balance = Some(BigDecimal::from(100));
        let pool = derive(state).unwrap();
        assert_eq!(pool.liquidity, BigDecimal::from(600));
    }

    #[test]
    fn liquidity_falls_back_to_difference_without_vault_balance() {
        let pool = derive(raw(1000, 1000, 500, 400, 400, 400)).unwrap();
        assert_eq!(pool.liquidity, BigDecimal::from(600));
    }

    #[test]
    fn non_positive_derived_ratio_is_malformed() {
        // positive virtual baseline but zero outstanding units
        let err = derive(raw(1000, 0, 500, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedState(_)));
    }

    #[test]
    fn negative_supply_is_malformed() {
        let err = derive(raw(-1, 100, 100, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedState(_)));
    }
}
