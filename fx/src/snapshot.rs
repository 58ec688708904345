//! Normalized rate snapshots.

use std::collections::BTreeMap;

use chrono::Duration;
use fxrates_common::{time, Currency, Timestamp};
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a set of rates cannot form a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No currency other than the base currency.
    #[error("no rates besides the base currency")]
    Empty,

    /// A rate of zero or below.
    #[error("rate for {currency} must be positive, got {value}")]
    NonPositiveRate { currency: Currency, value: Decimal },
}

/// One consistent, timestamped set of normalized rates.
///
/// Every rate is the amount of base currency equal to one unit of the keyed
/// currency. The base currency itself is always present at exactly `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    source_date: String,
    fetched_at: Timestamp,
    rates: BTreeMap<Currency, Decimal>,
}

impl RateSnapshot {
    /// Build a snapshot, enforcing the rate invariants.
    ///
    /// `base` is inserted at `1` and overrides any entry the input carries
    /// for it.
    pub fn new(
        source_date: impl Into<String>,
        fetched_at: Timestamp,
        mut rates: BTreeMap<Currency, Decimal>,
        base: &Currency,
    ) -> Result<Self, SnapshotError> {
        rates.remove(base);
        if rates.is_empty() {
            return Err(SnapshotError::Empty);
        }

        if let Some((currency, value)) = rates.iter().find(|(_, v)| **v <= Decimal::ZERO) {
            return Err(SnapshotError::NonPositiveRate {
                currency: currency.clone(),
                value: *value,
            });
        }

        rates.insert(base.clone(), Decimal::ONE);

        Ok(Self {
            source_date: source_date.into(),
            fetched_at,
            rates,
        })
    }

    /// Calendar date the source published these rates for.
    pub fn source_date(&self) -> &str {
        &self.source_date
    }

    /// When this snapshot was obtained from the feed.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// [`fetched_at`](Self::fetched_at) as seconds since the Unix epoch.
    pub fn fetched_at_epoch(&self) -> f64 {
        time::to_epoch_seconds(self.fetched_at)
    }

    /// All rates, keyed by currency.
    pub fn rates(&self) -> &BTreeMap<Currency, Decimal> {
        &self.rates
    }

    /// Rate for a single currency.
    pub fn rate(&self, currency: &Currency) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.rates.contains_key(currency)
    }

    /// Currency codes in sorted order.
    pub fn currencies(&self) -> Vec<Currency> {
        self.rates.keys().cloned().collect()
    }

    /// Time elapsed since the snapshot was fetched.
    pub fn age(&self) -> Duration {
        time::age_of(self.fetched_at)
    }

    /// Whether the snapshot is younger than `window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        time::is_within(self.fetched_at, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rates(entries: &[(&str, Decimal)]) -> BTreeMap<Currency, Decimal> {
        entries
            .iter()
            .map(|(code, value)| (Currency::new(*code), *value))
            .collect()
    }

    #[test]
    fn test_base_is_forced_to_one() {
        let snapshot = RateSnapshot::new(
            "2024-01-05",
            time::now(),
            rates(&[("EUR", dec!(5.0735)), ("RON", dec!(3.2))]),
            &Currency::ron(),
        )
        .unwrap();

        assert_eq!(snapshot.rate(&Currency::ron()), Some(Decimal::ONE));
        assert_eq!(snapshot.rate(&Currency::eur()), Some(dec!(5.0735)));
        assert_eq!(snapshot.currencies(), vec![Currency::eur(), Currency::ron()]);
    }

    #[test]
    fn test_only_base_is_empty() {
        let result = RateSnapshot::new(
            "2024-01-05",
            time::now(),
            rates(&[("RON", dec!(1))]),
            &Currency::ron(),
        );
        assert_eq!(result, Err(SnapshotError::Empty));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let result = RateSnapshot::new(
            "2024-01-05",
            time::now(),
            rates(&[("EUR", dec!(5.0735)), ("USD", dec!(0))]),
            &Currency::ron(),
        );
        assert!(matches!(
            result,
            Err(SnapshotError::NonPositiveRate { currency, .. }) if currency == Currency::usd()
        ));
    }

    #[test]
    fn test_freshness() {
        let snapshot = RateSnapshot::new(
            "2024-01-05",
            time::now() - Duration::hours(2),
            rates(&[("EUR", dec!(5.0735))]),
            &Currency::ron(),
        )
        .unwrap();

        assert!(snapshot.is_fresh(Duration::hours(24)));
        assert!(!snapshot.is_fresh(Duration::hours(1)));
    }
}
