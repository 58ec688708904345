//! FxRates Engine
//!
//! Fetches the BNR daily reference-rate feed, normalizes it to "base
//! currency per one unit", caches it on disk with a freshness window and
//! converts between any two published currencies through the base currency.
//!
//! # Features
//!
//! - Single bounded HTTP fetch per refresh, no retries
//! - Multiplier-aware feed normalization into exact decimals
//! - JSON snapshot cache with a 24 hour freshness window and stale fallback
//! - Pivot conversion rounded half-to-even to 4 decimal places
//!
//! # Example
//!
//! ```rust,ignore
//! use fxrates_engine::{FxEngine, FxEngineConfig, RefreshOutcome};
//!
//! let mut engine = FxEngine::from_config(FxEngineConfig::from_env())?;
//!
//! match engine.refresh(false)? {
//!     RefreshOutcome::Online => println!("live rates"),
//!     RefreshOutcome::Offline => println!("cached rates"),
//! }
//!
//! let usd = engine.convert(100.0, "EUR", "USD")?;
//! ```

pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod feed;
pub mod snapshot;
pub mod source;
pub mod status;

pub use cache::CacheStore;
pub use config::FxEngineConfig;
pub use conversion::Conversion;
pub use engine::FxEngine;
pub use error::{FxError, FxResult};
pub use feed::FeedNormalizer;
pub use snapshot::RateSnapshot;
pub use source::{HttpRateSource, RateSource};
pub use status::{RateStatus, RefreshOutcome};

#[cfg(any(test, feature = "test-utils"))]
pub use source::MockRateSource;
