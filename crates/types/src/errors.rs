//! Error taxonomy for the position accounting engine.
//!
//! The engine never retries and never substitutes a default for missing
//! data: a missing price or pool state aborts the computation, because a
//! zeroed-out contribution would understate debt or overstate liquidity.

use bigdecimal::BigDecimal;
use thiserror::Error;

/// Main engine error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed, negative, or non-finite quantity. Never silently coerced
    /// to zero; callers must reject the input.
    #[error("invalid numeric input for '{field}': {reason}")]
    InvalidNumericInput { field: String, reason: String },

    /// The asset is not known to the market registry.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// The remote gateway could not be reached.
    #[error("gateway unreachable: {0}")]
    RemoteUnavailable(String),

    /// The gateway responded with state the engine cannot interpret.
    #[error("malformed gateway state: {0}")]
    MalformedState(String),

    /// A batch pool-state read failed. Batches have no partial success:
    /// one missing pool would mis-price the whole position.
    #[error("pool state unavailable for {resource}: {source}")]
    PoolStateUnavailable {
        resource: String,
        #[source]
        source: Box<EngineError>,
    },

    /// No price is available for a held asset.
    #[error("no price available for {0}")]
    PriceUnavailable(String),

    /// The account does not hold enough of the asset to cover the request.
    /// A user-facing validation failure, not a system fault.
    #[error("insufficient balance for {resource}: have {available}, requested {requested}")]
    InsufficientBalance {
        resource: String,
        available: BigDecimal,
        requested: BigDecimal,
    },
}

impl EngineError {
    /// Create an invalid-input error with context.
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidNumericInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-state error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedState(reason.into())
    }

    /// Wrap an upstream failure as a batch pool-state failure.
    pub fn pool_state_unavailable(resource: impl Into<String>, source: EngineError) -> Self {
        Self::PoolStateUnavailable {
            resource: resource.into(),
            source: Box::new(source),
        }
    }

    /// Create an insufficient-balance error.
    pub fn insufficient_balance(
        resource: impl Into<String>,
        available: BigDecimal,
        requested: BigDecimal,
    ) -> Self {
        Self::InsufficientBalance {
            resource: resource.into(),
            available,
            requested,
        }
    }
}

/// Result type alias using the shared error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
