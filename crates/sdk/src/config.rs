//! Engine configuration.
//!
//! Policy numbers (health floor, risk tiers, default slippage) are
//! protocol governance values and ride in here rather than as literals in
//! the engine.

use anyhow::{ensure, Context, Result};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crest_types::constants::{
    DEFAULT_POOL_STATE_TTL_SECS, DEFAULT_PRICE_TTL_SECS, MAX_POOL_STATE_TTL_SECS,
};
use crest_types::{AssetConfig, RiskPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub policy: RiskPolicy,
    /// Listed assets with their quoted APRs.
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Base URL of the remote ledger gateway.
    #[validate(url)]
    pub base_url: String,
    /// Key-value store holding the asset -> cluster registry.
    pub registry_store: String,
    #[validate(range(min = 1, max = 60))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1, max = 120))]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.crest.markets".to_string(),
            registry_store: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// Display-path pool-state TTL. Capped at 30 s; transaction-amount
    /// derivation bypasses the cache entirely.
    #[validate(range(min = 0, max = 30))]
    pub pool_state_ttl_secs: u64,
    #[validate(range(min = 0, max = 300))]
    pub price_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pool_state_ttl_secs: DEFAULT_POOL_STATE_TTL_SECS,
            price_ttl_secs: DEFAULT_PRICE_TTL_SECS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional TOML file with `CREST_*`
    /// environment overrides, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("CREST").separator("__"))
            .build()
            .context("failed to read engine configuration")?;

        let config: EngineConfig = settings
            .try_deserialize()
            .context("failed to deserialize engine configuration")?;
        config.validate_sections()?;
        Ok(config)
    }

    /// Validate every section, including the policy invariants validator
    /// cannot express over decimals.
    pub fn validate_sections(&self) -> Result<()> {
        self.gateway.validate().context("invalid gateway config")?;
        self.cache.validate().context("invalid cache config")?;
        ensure!(
            self.cache.pool_state_ttl_secs <= MAX_POOL_STATE_TTL_SECS,
            "pool state TTL exceeds the {MAX_POOL_STATE_TTL_SECS}s maximum"
        );
        ensure!(
            self.policy.min_health_ratio > BigDecimal::zero(),
            "minimum health ratio must be positive"
        );
        ensure!(
            self.policy.default_slippage_fraction >= BigDecimal::zero(),
            "default slippage fraction must not be negative"
        );
        ensure!(
            self.policy.moderate_risk_pct <= self.policy.high_risk_pct,
            "moderate risk threshold must not exceed the high one"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate_sections().unwrap();
    }

    #[test]
    fn pool_state_ttl_is_capped() {
        let mut config = EngineConfig::default();
        config.cache.pool_state_ttl_secs = 45;
        assert!(config.validate_sections().is_err());
    }

    #[test]
    fn policy_floor_must_be_positive() {
        let mut config = EngineConfig::default();
        config.policy.min_health_ratio = BigDecimal::zero();
        assert!(config.validate_sections().is_err());
    }
}
