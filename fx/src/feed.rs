//! Feed normalization.
//!
//! Turns the published XML document into a [`RateSnapshot`] whose rates are
//! all "base currency per one unit", independent of the feed's per-currency
//! multiplier convention.
//!
//! The document shape is:
//!
//! ```xml
//! <DataSet xmlns="http://www.bnr.ro/xsd">
//!   <Body>
//!     <Cube date="2024-01-05">
//!       <Rate currency="EUR">4.9712</Rate>
//!       <Rate currency="HUF" multiplier="100">1.3012</Rate>
//!     </Cube>
//!   </Body>
//! </DataSet>
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use fxrates_common::{time, Currency, Timestamp};
use roxmltree::{Document, Node};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::snapshot::RateSnapshot;

/// Namespace of the National Bank of Romania reference-rate feed.
pub const BNR_NAMESPACE: &str = "http://www.bnr.ro/xsd";

const CUBE_TAG: &str = "Cube";
const RATE_TAG: &str = "Rate";

/// Parses feed documents into snapshots.
#[derive(Debug, Clone)]
pub struct FeedNormalizer {
    namespace: String,
    base: Currency,
}

impl FeedNormalizer {
    /// Create a normalizer for documents in `namespace`, quoting against `base`.
    pub fn new(namespace: impl Into<String>, base: Currency) -> Self {
        Self {
            namespace: namespace.into(),
            base,
        }
    }

    /// Normalizer for the BNR feed with RON as base.
    pub fn bnr() -> Self {
        Self::new(BNR_NAMESPACE, Currency::ron())
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// Normalize a payload, stamping it as fetched now.
    pub fn normalize(&self, payload: &[u8]) -> FxResult<RateSnapshot> {
        self.normalize_at(payload, time::now())
    }

    /// Normalize a payload with an explicit fetch instant.
    pub fn normalize_at(&self, payload: &[u8], fetched_at: Timestamp) -> FxResult<RateSnapshot> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| FxError::FeedParse(format!("payload is not UTF-8: {}", e)))?;
        let doc = Document::parse(text).map_err(|e| FxError::FeedParse(e.to_string()))?;

        let source_date = self.source_date(&doc);

        let mut rates = BTreeMap::new();
        for node in doc
            .descendants()
            .filter(|n| n.has_tag_name((self.namespace.as_str(), RATE_TAG)))
        {
            let (currency, rate) = parse_rate(node)?;
            rates.insert(currency, rate);
        }

        let count = rates.len();
        let snapshot = RateSnapshot::new(source_date, fetched_at, rates, &self.base)
            .map_err(|e| FxError::FeedParse(e.to_string()))?;

        debug!(
            source_date = snapshot.source_date(),
            entries = count,
            "Normalized feed"
        );

        Ok(snapshot)
    }

    /// Publication date from the cube element, or today when absent.
    fn source_date(&self, doc: &Document<'_>) -> String {
        doc.descendants()
            .find(|n| n.has_tag_name((self.namespace.as_str(), CUBE_TAG)))
            .and_then(|n| n.attribute("date"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(time::local_date_string)
    }
}

impl Default for FeedNormalizer {
    fn default() -> Self {
        Self::bnr()
    }
}

fn parse_rate(node: Node<'_, '_>) -> FxResult<(Currency, Decimal)> {
    let currency = node
        .attribute("currency")
        .map(Currency::new)
        .filter(|c| !c.code().is_empty())
        .ok_or_else(|| FxError::FeedParse("rate entry without currency".to_string()))?;

    let value = node
        .text()
        .and_then(parse_number)
        .ok_or_else(|| FxError::FeedParse(format!("non-numeric rate for {}", currency)))?;

    let multiplier = match node.attribute("multiplier").map(str::trim) {
        None | Some("") => return Ok((currency, value)),
        Some(raw) => parse_number(raw)
            .filter(|m| *m > Decimal::ZERO)
            .ok_or_else(|| FxError::FeedParse(format!("invalid multiplier for {}: {}", currency, raw)))?,
    };

    let rate = value
        .checked_div(multiplier)
        .ok_or_else(|| FxError::FeedParse(format!("rate for {} out of range", currency)))?;

    Ok((currency, rate))
}

fn parse_number(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
