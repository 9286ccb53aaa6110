//! Gateway port and its HTTP adapter.
//!
//! The engine reads everything it needs (registry lookups, aggregated
//! vault state, prices, account balances) through the [`Gateway`] port.
//! `HttpGateway` is the thin JSON-over-HTTP adapter for the remote ledger
//! gateway; `MockGateway` (feature `mock-gateway`) serves the same port
//! from in-memory maps.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crest_math::parse_decimal;
use crest_types::{
    AccountAddress, ClusterAddress, EngineError, EngineResult, PositionBalances, ResourceAddress,
    VaultAggregatedState,
};

use crate::config::GatewayConfig;

/// Read-only port onto the remote ledger.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Resolve the cluster component owning an asset's pool.
    async fn resolve_cluster_address(
        &self,
        resource: &ResourceAddress,
    ) -> EngineResult<ClusterAddress>;

    /// Fetch the aggregated vault state of one cluster.
    async fn vault_aggregated_state(
        &self,
        cluster: &ClusterAddress,
    ) -> EngineResult<VaultAggregatedState>;

    /// Current oracle price of an asset in the common pricing unit.
    async fn price(&self, resource: &ResourceAddress) -> EngineResult<BigDecimal>;

    /// The account's authoritative position holdings (supply and debt
    /// units per asset), from its on-ledger position metadata.
    async fn position_balances(&self, account: &AccountAddress)
        -> EngineResult<PositionBalances>;

    /// The account's wallet balance of a native asset.
    async fn wallet_balance(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
    ) -> EngineResult<BigDecimal>;

    /// The account's supply-unit balance for one asset. Absent entries
    /// read as zero.
    async fn unit_balance(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
    ) -> EngineResult<BigDecimal> {
        let balances = self.position_balances(account).await?;
        Ok(balances
            .supplied_units
            .get(resource)
            .cloned()
            .unwrap_or_else(BigDecimal::zero))
    }

    /// The account's debt-unit balance for one asset. Absent entries read
    /// as zero.
    async fn debt_unit_balance(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
    ) -> EngineResult<BigDecimal> {
        let balances = self.position_balances(account).await?;
        Ok(balances
            .debt_units
            .get(resource)
            .cloned()
            .unwrap_or_else(BigDecimal::zero))
    }
}

// ============================================================================
// HTTP adapter
// ============================================================================

/// JSON-over-HTTP gateway adapter.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    registry_store: String,
}

// Wire DTOs. Decimal quantities arrive as strings and are parsed through
// the decimal layer; a shape the engine cannot interpret is MalformedState.

#[derive(Debug, Deserialize)]
struct RegistryEntriesResponse {
    entries: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    value: RegistryValue,
}

#[derive(Debug, Deserialize)]
struct RegistryValue {
    cluster: String,
}

#[derive(Debug, Deserialize)]
struct ClusterStateResponse {
    supply: String,
    supply_units: String,
    virtual_supply: String,
    debt: String,
    debt_units: String,
    virtual_debt: String,
    vault_balance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    asset: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    supplied_units: std::collections::BTreeMap<String, String>,
    debt_units: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    amount: String,
}

impl HttpGateway {
    /// Build an adapter from the gateway configuration.
    pub fn new(config: &GatewayConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            registry_store: config.registry_store.clone(),
        })
    }

    async fn post_json<T>(&self, path: &str, body: serde_json::Value) -> EngineResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!(path, "gateway request");
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::RemoteUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::RemoteUnavailable(format!(
                "gateway returned {} for {path}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::malformed(format!("{path}: {e}")))
    }

    async fn get_json<T>(&self, path: &str) -> EngineResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!(path, "gateway request");
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| EngineError::RemoteUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::RemoteUnavailable(format!(
                "gateway returned {} for {path}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::malformed(format!("{path}: {e}")))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn resolve_cluster_address(
        &self,
        resource: &ResourceAddress,
    ) -> EngineResult<ClusterAddress> {
        let body = json!({
            "key_value_store_address": self.registry_store,
            "keys": [resource.as_str()],
        });
        let response: RegistryEntriesResponse =
            self.post_json("/state/key-value-store/data", body).await?;

        let entry = response
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::UnknownAsset(resource.to_string()))?;
        Ok(ClusterAddress::new(entry.value.cluster))
    }

    async fn vault_aggregated_state(
        &self,
        cluster: &ClusterAddress,
    ) -> EngineResult<VaultAggregatedState> {
        let body = json!({
            "addresses": [cluster.as_str()],
            "aggregation_level": "Vault",
        });
        let state: ClusterStateResponse = self.post_json("/state/entity/details", body).await?;

        Ok(VaultAggregatedState {
            supply: parse_decimal("supply", &state.supply)?,
            supply_units: parse_decimal("supply_units", &state.supply_units)?,
            virtual_supply: parse_decimal("virtual_supply", &state.virtual_supply)?,
            debt: parse_decimal("debt", &state.debt)?,
            debt_units: parse_decimal("debt_units", &state.debt_units)?,
            virtual_debt: parse_decimal("virtual_debt", &state.virtual_debt)?,
            vault_balance: state
                .vault_balance
                .as_deref()
                .map(|v| parse_decimal("vault_balance", v))
                .transpose()?,
        })
    }

    async fn price(&self, resource: &ResourceAddress) -> EngineResult<BigDecimal> {
        let response: PricesResponse = self.get_json("/prices").await?;
        let entry = response
            .prices
            .into_iter()
            .find(|p| p.asset == resource.as_str())
            .ok_or_else(|| EngineError::PriceUnavailable(resource.to_string()))?;
        parse_decimal("price", &entry.price)
    }

    async fn position_balances(
        &self,
        account: &AccountAddress,
    ) -> EngineResult<PositionBalances> {
        let response: PositionResponse =
            self.get_json(&format!("/positions/{account}")).await?;

        let mut balances = PositionBalances::default();
        for (resource, units) in response.supplied_units {
            let units = parse_decimal("supplied_units", &units)?;
            balances.supplied_units.insert(ResourceAddress::new(resource), units);
        }
        for (resource, units) in response.debt_units {
            let units = parse_decimal("debt_units", &units)?;
            balances.debt_units.insert(ResourceAddress::new(resource), units);
        }
        Ok(balances)
    }

    async fn wallet_balance(
        &self,
        account: &AccountAddress,
        resource: &ResourceAddress,
    ) -> EngineResult<BigDecimal> {
        let response: BalanceResponse = self
            .get_json(&format!("/accounts/{account}/balances/{resource}"))
            .await?;
        parse_decimal("wallet_balance", &response.amount)
    }
}

// ============================================================================
// In-memory double
// ============================================================================

#[cfg(feature = "mock-gateway")]
pub use mock::MockGateway;

#[cfg(feature = "mock-gateway")]
mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory gateway for tests and local development.
    #[derive(Default)]
    pub struct MockGateway {
        clusters: Mutex<BTreeMap<ResourceAddress, ClusterAddress>>,
        states: Mutex<BTreeMap<ClusterAddress, VaultAggregatedState>>,
        prices: Mutex<BTreeMap<ResourceAddress, BigDecimal>>,
        positions: Mutex<BTreeMap<AccountAddress, PositionBalances>>,
        wallets: Mutex<BTreeMap<(AccountAddress, ResourceAddress), BigDecimal>>,
        unreachable_clusters: Mutex<Vec<ClusterAddress>>,
        state_fetches: AtomicUsize,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_pool(
            &self,
            resource: ResourceAddress,
            cluster: ClusterAddress,
            state: VaultAggregatedState,
        ) {
            self.clusters
                .lock()
                .unwrap()
                .insert(resource, cluster.clone());
            self.states.lock().unwrap().insert(cluster, state);
        }

        pub fn insert_price(&self, resource: ResourceAddress, price: BigDecimal) {
            self.prices.lock().unwrap().insert(resource, price);
        }

        pub fn insert_position(&self, account: AccountAddress, balances: PositionBalances) {
            self.positions.lock().unwrap().insert(account, balances);
        }

        pub fn insert_wallet_balance(
            &self,
            account: AccountAddress,
            resource: ResourceAddress,
            amount: BigDecimal,
        ) {
            self.wallets
                .lock()
                .unwrap()
                .insert((account, resource), amount);
        }

        /// Make subsequent state fetches for a cluster fail as a network
        /// error.
        pub fn mark_unreachable(&self, cluster: ClusterAddress) {
            self.unreachable_clusters.lock().unwrap().push(cluster);
        }

        /// Number of vault-state fetches served so far.
        pub fn state_fetch_count(&self) -> usize {
            self.state_fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn resolve_cluster_address(
            &self,
            resource: &ResourceAddress,
        ) -> EngineResult<ClusterAddress> {
            self.clusters
                .lock()
                .unwrap()
                .get(resource)
                .cloned()
                .ok_or_else(|| EngineError::UnknownAsset(resource.to_string()))
        }

        async fn vault_aggregated_state(
            &self,
            cluster: &ClusterAddress,
        ) -> EngineResult<VaultAggregatedState> {
            if self.unreachable_clusters.lock().unwrap().contains(cluster) {
                return Err(EngineError::RemoteUnavailable(format!(
                    "mock gateway: {cluster} unreachable"
                )));
            }
            self.state_fetches.fetch_add(1, Ordering::SeqCst);
            self.states
                .lock()
                .unwrap()
                .get(cluster)
                .cloned()
                .ok_or_else(|| EngineError::malformed(format!("no state for {cluster}")))
        }

        async fn price(&self, resource: &ResourceAddress) -> EngineResult<BigDecimal> {
            self.prices
                .lock()
                .unwrap()
                .get(resource)
                .cloned()
                .ok_or_else(|| EngineError::PriceUnavailable(resource.to_string()))
        }

        async fn position_balances(
            &self,
            account: &AccountAddress,
        ) -> EngineResult<PositionBalances> {
            Ok(self
                .positions
                .lock()
                .unwrap()
                .get(account)
                .cloned()
                .unwrap_or_default())
        }

        async fn wallet_balance(
            &self,
            account: &AccountAddress,
            resource: &ResourceAddress,
        ) -> EngineResult<BigDecimal> {
            Ok(self
                .wallets
                .lock()
                .unwrap()
                .get(&(account.clone(), resource.clone()))
                .cloned()
                .unwrap_or_else(BigDecimal::zero))
        }
    }
}
