//! Refresh outcomes and the availability states presenters display.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FxResult;

/// Where the current snapshot came from after a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshOutcome {
    /// Fetched from the network just now.
    Online,
    /// Served from the cache, either because it was fresh or as a fallback.
    Offline,
}

impl RefreshOutcome {
    pub fn is_online(&self) -> bool {
        matches!(self, RefreshOutcome::Online)
    }

    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Online => "BNR (Live)",
            RefreshOutcome::Offline => "Cache (Offline)",
        }
    }
}

/// The three states a presenter must tell apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateStatus {
    /// Served fresh from the network.
    Online { source_date: String },
    /// Served from the cache.
    Offline { source_date: String },
    /// Nothing available from any source.
    Unavailable { reason: String },
}

impl RateStatus {
    /// Classify the result of a refresh.
    ///
    /// `source_date` is the date of the snapshot the engine holds afterwards.
    pub fn from_refresh(result: &FxResult<RefreshOutcome>, source_date: Option<&str>) -> Self {
        let source_date = source_date.unwrap_or("N/A").to_string();
        match result {
            Ok(RefreshOutcome::Online) => RateStatus::Online { source_date },
            Ok(RefreshOutcome::Offline) => RateStatus::Offline { source_date },
            Err(e) => RateStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, RateStatus::Unavailable { .. })
    }

    /// Status line shown next to the refresh control.
    pub fn status_line(&self) -> String {
        match self {
            RateStatus::Online { source_date } => {
                format!("Last update: {} [{}]", source_date, RefreshOutcome::Online.label())
            }
            RateStatus::Offline { source_date } => {
                format!("Last update: {} [{}]", source_date, RefreshOutcome::Offline.label())
            }
            RateStatus::Unavailable { .. } => "Status: Error".to_string(),
        }
    }
}

impl fmt::Display for RateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_line())
    }
}
