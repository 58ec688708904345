//! Engine configuration.

use std::path::PathBuf;

use chrono::Duration;
use fxrates_common::{constants, Currency};

use crate::feed::BNR_NAMESPACE;

/// Published location of the BNR daily reference rates.
pub const BNR_FEED_URL: &str = "https://www.bnr.ro/nbrfxrates.xml";

/// Default cache file, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "bnr_rates_cache.json";

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Feed document URL.
    pub feed_url: String,
    /// XML namespace of the feed's elements.
    pub feed_namespace: String,
    /// Cache record location.
    pub cache_path: PathBuf,
    /// Currency every rate is quoted against.
    pub base_currency: Currency,
    /// Bound on the single feed request.
    pub request_timeout: Duration,
    /// Cached snapshots younger than this skip the network.
    pub max_cache_age: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            feed_url: BNR_FEED_URL.to_string(),
            feed_namespace: BNR_NAMESPACE.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            base_currency: Currency::ron(),
            request_timeout: constants::feed_request_timeout(),
            max_cache_age: constants::cache_freshness_window(),
            log_level: "info".to_string(),
        }
    }
}

impl FxEngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("FX_FEED_URL") {
            config.feed_url = url;
        }

        if let Some(path) = lookup("FX_CACHE_FILE") {
            config.cache_path = PathBuf::from(path);
        }

        if let Some(base) = lookup("FX_BASE_CURRENCY") {
            config.base_currency = Currency::new(base);
        }

        if let Some(secs) = lookup("FX_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.trim().parse::<i64>() {
                config.request_timeout = Duration::seconds(secs);
            }
        }

        if let Some(secs) = lookup("FX_CACHE_MAX_AGE_SECS") {
            if let Ok(secs) = secs.trim().parse::<i64>() {
                config.max_cache_age = Duration::seconds(secs);
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.feed_url.trim().is_empty() {
            return Err("Feed URL cannot be empty".to_string());
        }

        if self.cache_path.as_os_str().is_empty() {
            return Err("Cache path cannot be empty".to_string());
        }

        if !self.base_currency.is_well_formed() {
            return Err(format!(
                "Base currency must be a three-letter code, got {:?}",
                self.base_currency.code()
            ));
        }

        if self.request_timeout <= Duration::zero() {
            return Err("Request timeout must be positive".to_string());
        }

        if self.request_timeout > constants::max_request_timeout() {
            return Err(format!(
                "Request timeout cannot exceed {}s",
                constants::max_request_timeout().num_seconds()
            ));
        }

        if self.max_cache_age <= Duration::zero() {
            return Err("Maximum cache age must be positive".to_string());
        }

        Ok(())
    }
}
