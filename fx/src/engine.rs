//! Main FX engine implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use fxrates_common::Currency;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::CacheStore;
use crate::config::FxEngineConfig;
use crate::conversion::{self, Conversion};
use crate::error::{FxError, FxResult};
use crate::feed::FeedNormalizer;
use crate::snapshot::RateSnapshot;
use crate::source::{HttpRateSource, RateSource};
use crate::status::RefreshOutcome;

/// The main FX engine.
///
/// Owns exactly one current snapshot. `refresh` replaces it as a whole, so
/// conversions never see a half-updated set of rates. The engine is not
/// reentrant; `&mut self` on `refresh` and `convert` keeps two calls from
/// overlapping.
pub struct FxEngine {
    source: Arc<dyn RateSource>,
    normalizer: FeedNormalizer,
    store: CacheStore,
    config: FxEngineConfig,
    current: Option<RateSnapshot>,
}

impl FxEngine {
    /// Create a new FX engine with the given source.
    pub fn new(source: Arc<dyn RateSource>, config: FxEngineConfig) -> Self {
        let normalizer =
            FeedNormalizer::new(config.feed_namespace.clone(), config.base_currency.clone());
        let store = CacheStore::new(config.cache_path.clone(), normalizer.base().clone());

        Self {
            source,
            normalizer,
            store,
            config,
            current: None,
        }
    }

    /// Create an engine that fetches `config.feed_url` over HTTP.
    pub fn from_config(config: FxEngineConfig) -> FxResult<Self> {
        config.validate().map_err(FxError::Configuration)?;

        let timeout = config
            .request_timeout
            .to_std()
            .map_err(|e| FxError::Configuration(e.to_string()))?;
        let source = HttpRateSource::new(config.feed_url.clone(), timeout)?;
        info!(url = source.url(), timeout_secs = timeout.as_secs(), "Using HTTP feed source");

        Ok(Self::new(Arc::new(source), config))
    }

    /// Load rates, preferring a fresh cache over the network.
    ///
    /// 1. A cache younger than `max_cache_age` is adopted without touching
    ///    the network, unless `force_network` is set.
    /// 2. Otherwise one fetch is attempted; a valid result is cached and
    ///    adopted.
    /// 3. If the fetch or its parse fails, any cache (even stale) is adopted.
    /// 4. With neither, [`FxError::NoDataAvailable`] is returned and the
    ///    current snapshot is left as it was.
    #[instrument(skip(self))]
    pub fn refresh(&mut self, force_network: bool) -> FxResult<RefreshOutcome> {
        let cached = match self.store.load() {
            Some(snapshot) if !force_network && snapshot.is_fresh(self.config.max_cache_age) => {
                debug!(
                    age_secs = snapshot.age().num_seconds(),
                    "Cache is fresh, skipping network"
                );
                self.adopt(snapshot, RefreshOutcome::Offline);
                return Ok(RefreshOutcome::Offline);
            }
            other => other,
        };

        match self.fetch_from_network() {
            Ok(snapshot) => {
                if let Err(e) = self.store.save(&snapshot) {
                    warn!(error = %e, "Failed to write cache, keeping fetched rates in memory");
                }
                self.adopt(snapshot, RefreshOutcome::Online);
                Ok(RefreshOutcome::Online)
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    code = e.error_code(),
                    error = %e,
                    "Network refresh failed"
                );

                match cached {
                    Some(snapshot) => {
                        info!("Falling back to cached rates");
                        self.adopt(snapshot, RefreshOutcome::Offline);
                        Ok(RefreshOutcome::Offline)
                    }
                    None => {
                        error!("No rates available from network or cache");
                        Err(FxError::NoDataAvailable)
                    }
                }
            }
        }
    }

    /// Convert `amount` of `from` into `to`, rounded to 4 decimal places.
    ///
    /// Loads rates first if none are held.
    #[instrument(skip(self))]
    pub fn convert(&mut self, amount: f64, from: &str, to: &str) -> FxResult<Decimal> {
        self.ensure_loaded()?;
        let amount = conversion::validate_amount(amount)?;
        self.convert_decimal(amount, from, to)
            .map(|conversion| conversion.result)
    }

    /// Convert an exact decimal amount, returning the full conversion record.
    pub fn convert_decimal(
        &mut self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> FxResult<Conversion> {
        let snapshot = self.ensure_loaded()?;
        let conversion =
            conversion::convert(snapshot, amount, &Currency::new(from), &Currency::new(to))?;

        debug!(
            from = %conversion.from,
            to = %conversion.to,
            amount = %conversion.amount,
            result = %conversion.result,
            rate = %conversion.effective_rate(),
            "Conversion completed"
        );

        Ok(conversion)
    }

    /// The snapshot currently held, if any.
    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        self.current.as_ref()
    }

    /// Current rates, keyed by currency.
    pub fn rates(&self) -> Option<&BTreeMap<Currency, Decimal>> {
        self.current.as_ref().map(RateSnapshot::rates)
    }

    /// Source date of the current rates.
    pub fn source_date(&self) -> Option<&str> {
        self.current.as_ref().map(RateSnapshot::source_date)
    }

    /// Sorted currency codes of the current rates; empty before a refresh.
    pub fn currencies(&self) -> Vec<Currency> {
        self.current
            .as_ref()
            .map(RateSnapshot::currencies)
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn config(&self) -> &FxEngineConfig {
        &self.config
    }

    fn ensure_loaded(&mut self) -> FxResult<&RateSnapshot> {
        if self.current.is_none() {
            debug!("No rates loaded, refreshing");
            self.refresh(false)?;
        }
        self.current.as_ref().ok_or(FxError::NoDataAvailable)
    }

    fn fetch_from_network(&self) -> FxResult<RateSnapshot> {
        let payload = self.source.fetch()?;
        self.normalizer.normalize(&payload)
    }

    fn adopt(&mut self, snapshot: RateSnapshot, outcome: RefreshOutcome) {
        info!(
            source_date = snapshot.source_date(),
            currencies = snapshot.rates().len(),
            origin = outcome.label(),
            "Adopted rate snapshot"
        );
        self.current = Some(snapshot);
    }
}
