//! Position engine facade.
//!
//! Wires the gateway, the pool state accessor, the asset registry, and the
//! risk policy together behind the handful of calls a client actually
//! makes. Transaction-amount paths (the quantity resolvers and the
//! conversions) always read pool state fresh; display paths (health
//! snapshots, prices) may serve cached reads inside their TTLs.

use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crest_types::{
    AccountAddress, AssetConfig, EngineError, EngineResult, HealthSnapshot, Holding,
    ResourceAddress, RiskPolicy,
};

use crate::config::EngineConfig;
use crate::convert;
use crate::gateway::Gateway;
use crate::health::{compute_position_health, PriceMap};
use crate::pool_state::PoolStateAccessor;
use crate::resolve::{
    resolve_repay_quantity, resolve_withdraw_quantity, ResolvedRepayment, ResolvedWithdrawal,
};

/// The engine: one instance per gateway connection.
pub struct PositionEngine<G: Gateway> {
    gateway: Arc<G>,
    accessor: PoolStateAccessor<G>,
    policy: RiskPolicy,
    registry: BTreeMap<ResourceAddress, AssetConfig>,
    price_cache: Mutex<HashMap<ResourceAddress, (BigDecimal, Instant)>>,
    price_ttl: Duration,
}

impl<G: Gateway> PositionEngine<G> {
    pub fn new(gateway: Arc<G>, config: &EngineConfig) -> Self {
        let accessor = PoolStateAccessor::new(
            Arc::clone(&gateway),
            Duration::from_secs(config.cache.pool_state_ttl_secs),
        );
        let registry = config
            .assets
            .iter()
            .map(|asset| (asset.resource.clone(), asset.clone()))
            .collect();
        Self {
            gateway,
            accessor,
            policy: config.policy.clone(),
            registry,
            price_cache: Mutex::new(HashMap::new()),
            price_ttl: Duration::from_secs(config.cache.price_ttl_secs),
        }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn pool_states(&self) -> &PoolStateAccessor<G> {
        &self.accessor
    }

    // ------------------------------------------------------------------
    // Conversions (always on fresh pool state)
    // ------------------------------------------------------------------

    pub async fn supply_units_to_amount(
        &self,
        resource: &ResourceAddress,
        units: &BigDecimal,
    ) -> EngineResult<BigDecimal> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        convert::supply_units_to_amount(units, &pool)
    }

    pub async fn amount_to_supply_units(
        &self,
        resource: &ResourceAddress,
        amount: &BigDecimal,
    ) -> EngineResult<BigDecimal> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        convert::amount_to_supply_units(amount, &pool)
    }

    pub async fn debt_units_to_amount(
        &self,
        resource: &ResourceAddress,
        units: &BigDecimal,
    ) -> EngineResult<BigDecimal> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        convert::debt_units_to_amount(units, &pool)
    }

    pub async fn amount_to_debt_units(
        &self,
        resource: &ResourceAddress,
        amount: &BigDecimal,
    ) -> EngineResult<BigDecimal> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        convert::amount_to_debt_units(amount, &pool)
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Health snapshot over already-priced holdings supplied by the caller.
    pub async fn position_health(
        &self,
        supplied: &[Holding],
        borrowed: &[Holding],
    ) -> EngineResult<HealthSnapshot> {
        let mut resources: Vec<ResourceAddress> = Vec::new();
        for holding in supplied.iter().chain(borrowed) {
            if !resources.contains(&holding.resource) {
                resources.push(holding.resource.clone());
            }
        }
        let prices = self.prices_for(&resources).await?;
        compute_position_health(supplied, borrowed, &prices, &self.policy)
    }

    /// Full health snapshot for an account, from its on-ledger position:
    /// unit balances are converted to native amounts through fresh pool
    /// state and priced through the cache.
    pub async fn position_health_for(
        &self,
        account: &AccountAddress,
    ) -> EngineResult<HealthSnapshot> {
        let balances = self.gateway.position_balances(account).await?;

        let mut resources: Vec<ResourceAddress> = Vec::new();
        for resource in balances
            .supplied_units
            .keys()
            .chain(balances.debt_units.keys())
        {
            if !resources.contains(resource) {
                resources.push(resource.clone());
            }
        }
        if resources.is_empty() {
            return Ok(HealthSnapshot::empty());
        }

        let pools = self.accessor.fetch_pool_states(&resources).await?;

        let mut supplied = Vec::new();
        for (resource, units) in &balances.supplied_units {
            let pool = &pools[resource];
            supplied.push(Holding {
                resource: resource.clone(),
                amount: convert::supply_units_to_amount(units, pool)?,
                apr: self.asset(resource)?.supply_apr.clone(),
            });
        }

        let mut borrowed = Vec::new();
        for (resource, units) in &balances.debt_units {
            let pool = &pools[resource];
            borrowed.push(Holding {
                resource: resource.clone(),
                amount: convert::debt_units_to_amount(units, pool)?,
                apr: self.asset(resource)?.borrow_apr.clone(),
            });
        }

        let prices = self.prices_for(&resources).await?;
        compute_position_health(&supplied, &borrowed, &prices, &self.policy)
    }

    // ------------------------------------------------------------------
    // Quantity resolution
    // ------------------------------------------------------------------

    /// Resolve the units to submit for withdrawing `amount` native from the
    /// account's position. `slippage_fraction` defaults to the policy's.
    pub async fn resolve_withdraw_quantity(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
        amount: &BigDecimal,
        slippage_fraction: Option<&BigDecimal>,
    ) -> EngineResult<ResolvedWithdrawal> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        let unit_balance = self.gateway.unit_balance(account, resource).await?;
        let slippage = slippage_fraction.unwrap_or(&self.policy.default_slippage_fraction);
        debug!(%resource, %amount, %slippage, "resolving withdrawal");
        resolve_withdraw_quantity(&pool, amount, &unit_balance, slippage)
    }

    /// Resolve the native amount to submit for repaying `amount` of the
    /// account's debt.
    pub async fn resolve_repay_quantity(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
        amount: &BigDecimal,
        slippage_fraction: Option<&BigDecimal>,
    ) -> EngineResult<ResolvedRepayment> {
        let pool = self.accessor.fetch_pool_state(resource).await?;
        let debt_unit_balance = self.gateway.debt_unit_balance(account, resource).await?;
        let wallet_balance = self.gateway.wallet_balance(account, resource).await?;
        let slippage = slippage_fraction.unwrap_or(&self.policy.default_slippage_fraction);
        debug!(%resource, %amount, %slippage, "resolving repayment");
        resolve_repay_quantity(&pool, amount, &debt_unit_balance, &wallet_balance, slippage)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn asset(&self, resource: &ResourceAddress) -> EngineResult<&AssetConfig> {
        self.registry
            .get(resource)
            .ok_or_else(|| EngineError::UnknownAsset(resource.to_string()))
    }

    /// Price lookup through the display TTL cache.
    async fn prices_for(&self, resources: &[ResourceAddress]) -> EngineResult<PriceMap> {
        let mut prices = PriceMap::new();
        let mut cache = self.price_cache.lock().await;
        for resource in resources {
            if let Some((price, fetched_at)) = cache.get(resource) {
                if fetched_at.elapsed() <= self.price_ttl {
                    prices.insert(resource.clone(), price.clone());
                    continue;
                }
            }
            let price = self.gateway.price(resource).await?;
            cache.insert(resource.clone(), (price.clone(), Instant::now()));
            prices.insert(resource.clone(), price);
        }
        Ok(prices)
    }
}
