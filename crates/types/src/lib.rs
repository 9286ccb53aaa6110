//! Shared types for the Crest lending market client.
//!
//! Everything here is plain data: address newtypes, pool state with its
//! derived ratios, the position/health data model, the risk policy, and
//! the error taxonomy shared by every crate in the workspace.

pub mod asset;
pub mod constants;
pub mod errors;
pub mod policy;
pub mod pool;
pub mod position;

pub use asset::{AccountAddress, AssetConfig, ClusterAddress, ResourceAddress};
pub use constants::*;
pub use errors::{EngineError, EngineResult};
pub use policy::RiskPolicy;
pub use pool::{PoolState, VaultAggregatedState};
pub use position::{HealthRatio, HealthSnapshot, Holding, PositionBalances, RiskTier};
