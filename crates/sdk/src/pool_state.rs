//! Pool state accessor.
//!
//! Two read paths with different freshness guarantees: `fetch_*` always
//! hits the gateway and is the only path transaction-amount derivation may
//! use; `display_*` may serve a cached copy up to the configured TTL old.

use bigdecimal::BigDecimal;
use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crest_types::{EngineError, EngineResult, PoolState, ResourceAddress};

use crate::gateway::Gateway;

struct CachedPool {
    state: PoolState,
    fetched_at: Instant,
}

/// Accessor over the gateway with a display-only TTL cache.
pub struct PoolStateAccessor<G: Gateway> {
    gateway: Arc<G>,
    cache: Mutex<HashMap<ResourceAddress, CachedPool>>,
    display_ttl: Duration,
}

impl<G: Gateway> PoolStateAccessor<G> {
    pub fn new(gateway: Arc<G>, display_ttl: Duration) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
            display_ttl,
        }
    }

    /// Fetch one pool's state fresh from the gateway and derive its ratios.
    /// Failures are wrapped with the asset they belong to.
    pub async fn fetch_pool_state(&self, resource: &ResourceAddress) -> EngineResult<PoolState> {
        let state = self
            .fetch_uncached(resource)
            .await
            .map_err(|e| EngineError::pool_state_unavailable(resource.to_string(), e))?;

        let mut cache = self.cache.lock().await;
        cache.insert(
            resource.clone(),
            CachedPool {
                state: state.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(state)
    }

    /// Fetch several pools concurrently. All-or-nothing: one failed pool
    /// fails the batch, because a partial map would mis-price a position.
    pub async fn fetch_pool_states(
        &self,
        resources: &[ResourceAddress],
    ) -> EngineResult<BTreeMap<ResourceAddress, PoolState>> {
        let mut unique: Vec<&ResourceAddress> = Vec::new();
        for resource in resources {
            if !unique.contains(&resource) {
                unique.push(resource);
            }
        }

        let fetched = try_join_all(unique.iter().map(|r| self.fetch_pool_state(r))).await?;
        Ok(fetched
            .into_iter()
            .map(|state| (state.resource.clone(), state))
            .collect())
    }

    /// Display-path read: serve a cached copy when it is younger than the
    /// TTL, otherwise refresh. Never used to derive transaction amounts.
    pub async fn display_pool_state(&self, resource: &ResourceAddress) -> EngineResult<PoolState> {
        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(resource) {
                if cached.fetched_at.elapsed() <= self.display_ttl {
                    debug!(%resource, "serving cached pool state");
                    return Ok(cached.state.clone());
                }
            }
        }
        self.fetch_pool_state(resource).await
    }

    /// Display-path batch read.
    pub async fn display_pool_states(
        &self,
        resources: &[ResourceAddress],
    ) -> EngineResult<BTreeMap<ResourceAddress, PoolState>> {
        let mut states = BTreeMap::new();
        for resource in resources {
            if states.contains_key(resource) {
                continue;
            }
            let state = self.display_pool_state(resource).await?;
            states.insert(resource.clone(), state);
        }
        Ok(states)
    }

    /// Native units available for withdrawal or borrowing from one pool.
    pub async fn available_liquidity(
        &self,
        resource: &ResourceAddress,
    ) -> EngineResult<BigDecimal> {
        Ok(self.fetch_pool_state(resource).await?.liquidity)
    }

    async fn fetch_uncached(&self, resource: &ResourceAddress) -> EngineResult<PoolState> {
        let cluster = self.gateway.resolve_cluster_address(resource).await?;
        let raw = self.gateway.vault_aggregated_state(&cluster).await?;
        debug!(%resource, %cluster, "fetched pool state");
        PoolState::derive(resource.clone(), cluster, raw)
    }
}
