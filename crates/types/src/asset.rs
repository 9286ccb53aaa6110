//! Address newtypes and per-asset registry entries.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! address_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(address: impl Into<String>) -> Self {
                Self(address.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(address: &str) -> Self {
                Self(address.to_string())
            }
        }
    };
}

address_newtype!(
    /// Opaque on-ledger identifier of a fungible asset.
    ResourceAddress
);

address_newtype!(
    /// Address of the pool cluster component owning one asset's market.
    ClusterAddress
);

address_newtype!(
    /// Address of a user account.
    AccountAddress
);

/// Registry entry for one listed asset.
///
/// APRs are quoted as percentages (5 means 5%); they feed the weighted-APR
/// aggregation in the health calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub resource: ResourceAddress,
    pub label: String,
    pub supply_apr: BigDecimal,
    pub borrow_apr: BigDecimal,
}
