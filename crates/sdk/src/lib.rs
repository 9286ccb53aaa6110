//! Crest position accounting and risk engine.
//!
//! Client-side accounting for the Crest lending market: pool state reads,
//! unit/amount conversion through share ratios, portfolio health, and
//! slippage-bounded quantity resolution for withdrawals and repayments.
//! All arithmetic runs on `BigDecimal`; nothing transaction-bound ever
//! passes through binary floating point.

pub mod config;
pub mod convert;
pub mod engine;
pub mod gateway;
pub mod health;
pub mod pool_state;
pub mod resolve;

pub use config::{CacheConfig, EngineConfig, GatewayConfig};
pub use convert::{
    amount_to_debt_units, amount_to_supply_units, debt_units_to_amount, supply_units_to_amount,
};
pub use engine::PositionEngine;
pub use gateway::{Gateway, HttpGateway};
pub use health::{
    compute_position_health, projected_health_after_repay, projected_health_after_withdraw,
    PriceMap,
};
pub use pool_state::PoolStateAccessor;
pub use resolve::{
    resolve_repay_quantity, resolve_withdraw_quantity, ResolvedRepayment, ResolvedWithdrawal,
};

#[cfg(feature = "mock-gateway")]
pub use gateway::MockGateway;

// The shared building blocks, re-exported for downstream convenience.
pub use crest_math as math;
pub use crest_types as types;
