//! On-disk snapshot cache.
//!
//! One JSON record, overwritten on every save:
//!
//! ```json
//! {
//!   "timestamp": "2024-01-05",
//!   "fetched_at_epoch": 1704460800.25,
//!   "rates": { "EUR": 5.0735, "HUF": 0.017205, "RON": 1.0 }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fxrates_common::{time, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conversion::decimal_from_f64;
use crate::error::{FxError, FxResult};
use crate::snapshot::RateSnapshot;

/// Persisted form of a snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    /// Source date as published.
    timestamp: String,
    /// Older records may lack this; they count as infinitely stale.
    #[serde(default)]
    fetched_at_epoch: f64,
    rates: BTreeMap<String, f64>,
}

impl CacheRecord {
    fn from_snapshot(snapshot: &RateSnapshot) -> FxResult<Self> {
        let rates = snapshot
            .rates()
            .iter()
            .map(|(currency, rate)| {
                to_json_number(*rate)
                    .map(|v| (currency.code().to_string(), v))
                    .ok_or_else(|| FxError::CacheWrite(format!("rate for {} not representable", currency)))
            })
            .collect::<FxResult<_>>()?;

        Ok(Self {
            timestamp: snapshot.source_date().to_string(),
            fetched_at_epoch: snapshot.fetched_at_epoch(),
            rates,
        })
    }

    fn into_snapshot(self, base: &Currency) -> FxResult<RateSnapshot> {
        let fetched_at = time::from_epoch_seconds(self.fetched_at_epoch).ok_or_else(|| {
            FxError::CacheRead(format!("invalid fetched_at_epoch {}", self.fetched_at_epoch))
        })?;

        let rates = self
            .rates
            .into_iter()
            .map(|(code, value)| {
                decimal_from_f64(value)
                    .map(|rate| (Currency::new(code.as_str()), rate))
                    .ok_or_else(|| FxError::CacheRead(format!("invalid rate for {}: {}", code, value)))
            })
            .collect::<FxResult<BTreeMap<_, _>>>()?;

        RateSnapshot::new(self.timestamp, fetched_at, rates, base)
            .map_err(|e| FxError::CacheRead(e.to_string()))
    }
}

/// Rates travel through their shortest decimal text so `0.017205` survives
/// the trip through `f64` unchanged.
fn to_json_number(rate: Decimal) -> Option<f64> {
    f64::from_str(&rate.to_string()).ok().filter(|v| v.is_finite())
}

/// Single-record snapshot store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    base: Currency,
}

impl CacheStore {
    /// Create a store at `path` for snapshots quoted against `base`.
    pub fn new(path: impl Into<PathBuf>, base: Currency) -> Self {
        Self {
            path: path.into(),
            base,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot, replacing any previous record.
    ///
    /// The record is written to a sibling temporary file and renamed into
    /// place, so readers never observe a half-written file.
    pub fn save(&self, snapshot: &RateSnapshot) -> FxResult<()> {
        let record = CacheRecord::from_snapshot(snapshot)?;
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| FxError::CacheWrite(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FxError::CacheWrite(e.to_string()))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp);
                FxError::CacheWrite(format!("{}: {}", self.path.display(), e))
            })?;

        debug!(path = %self.path.display(), source_date = snapshot.source_date(), "Cached snapshot");
        Ok(())
    }

    /// Read the record back.
    ///
    /// `Ok(None)` when no record exists; an error when one exists but is
    /// unreadable or violates the snapshot invariants.
    pub fn try_load(&self) -> FxResult<Option<RateSnapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FxError::CacheRead(e.to_string())),
        };

        let record: CacheRecord =
            serde_json::from_slice(&bytes).map_err(|e| FxError::CacheRead(e.to_string()))?;

        record.into_snapshot(&self.base).map(Some)
    }

    /// Read the record back, treating any corruption as absence.
    pub fn load(&self) -> Option<RateSnapshot> {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                debug!(path = %self.path.display(), "Cache hit");
                Some(snapshot)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "Cache miss");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable cache");
                None
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
