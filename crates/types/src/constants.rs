//! Numeric constants shared across the workspace.

/// Significant digits kept by every division in the decimal layer.
///
/// Pool ratios are chained through several divisions before a quantity is
/// submitted; 36 digits keeps the cumulative rounding error well below the
/// submission scale.
pub const WORKING_PRECISION: u64 = 36;

/// Fractional digits retained when a quantity is rounded for submission to
/// the ledger. The ledger's native decimal keeps 18 places.
pub const SUBMISSION_SCALE: i64 = 18;

/// Hard upper bound on pool-state cache age. Display paths may serve state
/// up to this old; transaction-amount derivation never reads the cache.
pub const MAX_POOL_STATE_TTL_SECS: u64 = 30;

/// Default TTL for the display-path pool-state cache.
pub const DEFAULT_POOL_STATE_TTL_SECS: u64 = 30;

/// Default TTL for the display-path price cache.
pub const DEFAULT_PRICE_TTL_SECS: u64 = 10;
