//! Currency codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 style currency code, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    ///
    /// Surrounding whitespace is dropped and the code is uppercased, so
    /// `" eur"` and `"EUR"` name the same currency.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether the code has the three-letter ISO shape.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_uppercase())
    }

    /// Common currencies
    pub fn ron() -> Self {
        Self::new("RON")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn huf() -> Self {
        Self::new("HUF")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for Currency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_is_uppercased() {
        assert_eq!(Currency::new("eur"), Currency::eur());
        assert_eq!(Currency::new(" huf "), Currency::huf());
        assert_eq!(Currency::from("usd").code(), "USD");
    }

    #[test]
    fn test_currency_shape() {
        assert!(Currency::ron().is_well_formed());
        assert!(!Currency::new("XAUX").is_well_formed());
        assert!(!Currency::new("R1N").is_well_formed());
        assert!(!Currency::new("").is_well_formed());
    }

    #[test]
    fn test_currency_ordering() {
        let mut codes = vec![Currency::usd(), Currency::eur(), Currency::huf()];
        codes.sort();
        assert_eq!(codes, vec![Currency::eur(), Currency::huf(), Currency::usd()]);
    }
}
