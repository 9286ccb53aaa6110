//! Decimal arithmetic layer for the Crest client.
//!
//! All financial math in the workspace goes through `BigDecimal`; binary
//! floating point never touches an amount that affects a transaction.

pub mod decimal;

pub use decimal::*;
