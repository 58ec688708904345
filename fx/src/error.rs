//! FX engine error types.

use fxrates_common::Currency;
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Amount is not a finite number greater than zero.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount is positive but larger than a decimal can hold.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// One or both currencies are absent from the loaded rates.
    #[error("Currency not found: {}", join_codes(.missing))]
    CurrencyNotFound { missing: Vec<Currency> },

    /// Neither the network nor the cache produced rates.
    #[error("Could not fetch rates and no cache available")]
    NoDataAvailable,

    /// Feed request failed (timeout, DNS, non-2xx status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Feed document could not be normalized.
    #[error("Feed parse error: {0}")]
    FeedParse(String),

    /// Cache record could not be written.
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// Cache record exists but could not be read back.
    #[error("Cache read failed: {0}")]
    CacheRead(String),

    /// Configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FxError {
    /// Errors caused by caller input rather than data availability.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FxError::InvalidAmount(_)
                | FxError::AmountOutOfRange(_)
                | FxError::CurrencyNotFound { .. }
        )
    }

    /// Get error code for presenters and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidAmount(_) => "INVALID_AMOUNT",
            FxError::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            FxError::CurrencyNotFound { .. } => "CURRENCY_NOT_FOUND",
            FxError::NoDataAvailable => "NO_DATA_AVAILABLE",
            FxError::Transport(_) => "TRANSPORT_ERROR",
            FxError::FeedParse(_) => "FEED_PARSE_ERROR",
            FxError::CacheWrite(_) => "CACHE_WRITE_ERROR",
            FxError::CacheRead(_) => "CACHE_READ_ERROR",
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

fn join_codes(codes: &[Currency]) -> String {
    codes
        .iter()
        .map(Currency::code)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
