//! FxRates Common Types
//!
//! Shared vocabulary for the fxrates workspace: currency codes and the
//! time helpers used by the rate engine's freshness policy.

pub mod currency;
pub mod time;

pub use currency::*;
pub use time::*;
