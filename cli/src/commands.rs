//! One-shot commands: `rates`, `convert` and `demo`.

use std::io::Write;

use anyhow::Context;
use fxrates_engine::{FxEngine, RateStatus};
use rust_decimal::Decimal;
use tracing::info;

use crate::form::write_rate_table;

/// Conversions the demo walks through.
const DEMO_CONVERSIONS: [(f64, &str, &str); 2] = [(100.0, "EUR", "USD"), (1000.0, "HUF", "RON")];

/// Amount the demo shows being rejected.
const DEMO_REJECTED_AMOUNT: f64 = -50.0;

/// Refresh and print the status line, failing when nothing could be loaded.
fn refresh_with_status<W: Write>(engine: &mut FxEngine, force: bool, out: &mut W) -> anyhow::Result<()> {
    let outcome = engine.refresh(force);
    let status = RateStatus::from_refresh(&outcome, engine.source_date());
    writeln!(out, "{}", status)?;

    let outcome = outcome.context("Failed to load rates")?;
    info!(online = outcome.is_online(), "Rates loaded");
    Ok(())
}

/// `rates`: status line plus the rate table.
pub fn rates<W: Write>(engine: &mut FxEngine, force: bool, out: &mut W) -> anyhow::Result<()> {
    refresh_with_status(engine, force, out)?;

    match engine.snapshot() {
        Some(snapshot) => write_rate_table(snapshot, out),
        None => anyhow::bail!("No rates loaded"),
    }
}

/// `convert`: one conversion. Without `force` rates load lazily.
pub fn convert<W: Write>(
    engine: &mut FxEngine,
    amount: Decimal,
    from: &str,
    to: &str,
    force: bool,
    out: &mut W,
) -> anyhow::Result<()> {
    if force {
        refresh_with_status(engine, true, out)?;
    }

    let conversion = engine.convert_decimal(amount, from, to)?;
    writeln!(out, "{}", conversion)?;
    Ok(())
}

/// `demo`: a short scripted walk through the engine.
pub fn demo<W: Write>(engine: &mut FxEngine, out: &mut W) -> anyhow::Result<()> {
    refresh_with_status(engine, false, out)?;

    writeln!(out, "Available currencies: {}", engine.currencies().len())?;

    for (amount, from, to) in DEMO_CONVERSIONS {
        match engine.convert(amount, from, to) {
            Ok(result) => writeln!(out, "{} {} = {} {}", amount, from, result, to)?,
            Err(e) => writeln!(out, "{} {} -> {}: {}", amount, from, to, e)?,
        }
    }

    match engine.convert(DEMO_REJECTED_AMOUNT, "EUR", "USD") {
        Ok(result) => anyhow::bail!("Negative amount was accepted: {}", result),
        Err(e) => writeln!(out, "Rejected {} EUR: {}", DEMO_REJECTED_AMOUNT, e)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_engine::{FxEngineConfig, MockRateSource};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::TempDir;

    const FEED: &str = r#"<DataSet xmlns="http://www.bnr.ro/xsd"><Body><Cube date="2024-01-05"><Rate currency="EUR">5.0735</Rate><Rate currency="USD">4.5</Rate><Rate currency="HUF" multiplier="100">1.7205</Rate></Cube></Body></DataSet>"#;

    fn engine_with(source: MockRateSource, dir: &TempDir) -> FxEngine {
        let config = FxEngineConfig {
            cache_path: dir.path().join("cache.json"),
            ..Default::default()
        };
        FxEngine::new(Arc::new(source), config)
    }

    fn capture(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = f(&mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_rates_prints_table() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with(MockRateSource::serving(FEED), &dir);

        let (result, output) = capture(|out| rates(&mut engine, false, out));
        result.unwrap();

        assert!(output.starts_with("Last update: 2024-01-05 [BNR (Live)]\n"));
        assert!(output.contains("  HUF  0.017205"));
        assert!(output.contains("  RON  1"));
        let eur = output.find("EUR").unwrap();
        let usd = output.find("USD").unwrap();
        assert!(eur < usd);
    }

    #[test]
    fn test_rates_without_data_fails() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with(MockRateSource::offline(), &dir);

        let (result, output) = capture(|out| rates(&mut engine, true, out));

        assert!(result.is_err());
        assert_eq!(output, "Status: Error\n");
    }

    #[test]
    fn test_convert_lazy_and_forced() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockRateSource::serving(FEED));
        let config = FxEngineConfig {
            cache_path: dir.path().join("cache.json"),
            ..Default::default()
        };
        let mut engine = FxEngine::new(source.clone(), config);

        let (result, output) = capture(|out| convert(&mut engine, dec!(100), "eur", "usd", false, out));
        result.unwrap();
        assert_eq!(output, "100 EUR = 112.7444 USD\n");

        let (result, output) = capture(|out| convert(&mut engine, dec!(1000), "HUF", "RON", true, out));
        result.unwrap();
        assert_eq!(output, "Last update: 2024-01-05 [BNR (Live)]\n1000 HUF = 17.205 RON\n");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_convert_unknown_currency_fails() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with(MockRateSource::serving(FEED), &dir);

        let (result, _) = capture(|out| convert(&mut engine, dec!(1), "EUR", "XYZ", false, out));
        assert_eq!(result.unwrap_err().to_string(), "Currency not found: XYZ");
    }

    #[test]
    fn test_demo() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with(MockRateSource::serving(FEED), &dir);

        let (result, output) = capture(|out| demo(&mut engine, out));
        result.unwrap();

        assert!(output.contains("Available currencies: 4"));
        assert!(output.contains("100 EUR = 112.7444 USD"));
        assert!(output.contains("1000 HUF = 17.205 RON"));
        assert!(output.contains("Rejected -50 EUR: Invalid amount"));
    }
}
