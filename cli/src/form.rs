//! Interactive converter form.
//!
//! A line-oriented take on the desktop form: an amount field, two currency
//! pickers, a convert action, a refresh action and a status line. Refreshes
//! run on the [`EngineWorker`] while the form keeps reading input.

use std::io::{BufRead, Write};
use std::str::FromStr;

use fxrates_common::Currency;
use fxrates_engine::{FxError, RateSnapshot, RateStatus};
use rust_decimal::Decimal;

use crate::worker::{EngineWorker, Reply, WorkerError};

const HELP: &str = "\
Commands:
  <amount> <from> <to>   convert in one step, e.g. `100 EUR USD`
  amount <n>             set the amount field
  from <code>            pick the source currency
  to <code>              pick the target currency
  convert                convert with the current fields
  refresh                fetch rates from the network
  rates                  list the loaded rates
  currencies             list the codes the pickers offer
  status                 show the status line
  help                   show this help
  quit                   leave";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quick {
        amount: Decimal,
        from: Currency,
        to: Currency,
    },
    Amount(Decimal),
    From(Currency),
    To(Currency),
    Convert,
    Refresh,
    Rates,
    Currencies,
    Status,
    Help,
    Quit,
}

/// Parse a line of input.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();

    match words.as_slice() {
        [] | ["help"] | ["?"] => Ok(Command::Help),
        ["quit"] | ["exit"] | ["q"] => Ok(Command::Quit),
        ["convert"] => Ok(Command::Convert),
        ["refresh"] => Ok(Command::Refresh),
        ["rates"] => Ok(Command::Rates),
        ["currencies"] => Ok(Command::Currencies),
        ["status"] => Ok(Command::Status),
        ["amount", value] => parse_amount(value).map(Command::Amount),
        ["from", code] => Ok(Command::From(Currency::new(*code))),
        ["to", code] => Ok(Command::To(Currency::new(*code))),
        [amount, from, to] => Ok(Command::Quick {
            amount: parse_amount(amount)?,
            from: Currency::new(*from),
            to: Currency::new(*to),
        }),
        _ => Err(format!("Unknown command: {}", line.trim())),
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("Invalid amount: {}", raw))
}

/// Field values and the data behind the pickers.
#[derive(Debug, Clone)]
pub struct ConverterForm {
    amount: Decimal,
    from: Option<Currency>,
    to: Option<Currency>,
    snapshot: Option<RateSnapshot>,
    status: Option<RateStatus>,
}

impl ConverterForm {
    pub fn new() -> Self {
        Self {
            amount: Decimal::ONE,
            from: None,
            to: None,
            snapshot: None,
            status: None,
        }
    }

    /// Take in a finished refresh.
    ///
    /// On success the pickers are repopulated, and empty pickers default to
    /// EUR and RON when those are offered.
    pub fn apply_refresh(&mut self, status: RateStatus, snapshot: Option<RateSnapshot>) {
        if status.is_available() {
            if let Some(snapshot) = snapshot {
                if self.from.is_none() && snapshot.contains(&Currency::eur()) {
                    self.from = Some(Currency::eur());
                }
                if self.to.is_none() && snapshot.contains(&Currency::ron()) {
                    self.to = Some(Currency::ron());
                }
                self.snapshot = Some(snapshot);
            }
        }
        self.status = Some(status);
    }

    pub fn set_amount(&mut self, amount: Decimal) {
        self.amount = amount;
    }

    /// Pick the source currency. Only offered codes are accepted once rates are loaded.
    pub fn select_from(&mut self, currency: Currency) -> Result<(), String> {
        self.check_offered(&currency)?;
        self.from = Some(currency);
        Ok(())
    }

    /// Pick the target currency.
    pub fn select_to(&mut self, currency: Currency) -> Result<(), String> {
        self.check_offered(&currency)?;
        self.to = Some(currency);
        Ok(())
    }

    /// Amount and both currencies, when all are set.
    pub fn selection(&self) -> Option<(Decimal, Currency, Currency)> {
        Some((self.amount, self.from.clone()?, self.to.clone()?))
    }

    /// Codes offered by the pickers, sorted.
    pub fn currencies(&self) -> Vec<Currency> {
        self.snapshot
            .as_ref()
            .map(RateSnapshot::currencies)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn status_line(&self) -> String {
        self.status
            .as_ref()
            .map(RateStatus::status_line)
            .unwrap_or_else(|| "Last update: N/A".to_string())
    }

    fn check_offered(&self, currency: &Currency) -> Result<(), String> {
        match &self.snapshot {
            Some(snapshot) if !snapshot.contains(currency) => {
                Err(format!("Currency not offered: {}", currency))
            }
            _ => Ok(()),
        }
    }
}

impl Default for ConverterForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the form until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(
    mut worker: EngineWorker,
    input: R,
    mut out: W,
) -> anyhow::Result<()> {
    let mut form = ConverterForm::new();

    worker.request_refresh(false)?;
    writeln!(out, "Updating...")?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        while let Some(reply) = worker.poll()? {
            render_reply(&mut form, reply, &mut out)?;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "Error: {}", message)?;
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Amount(amount) => form.set_amount(amount),
            Command::From(currency) => {
                if let Err(message) = form.select_from(currency) {
                    writeln!(out, "Error: {}", message)?;
                }
            }
            Command::To(currency) => {
                if let Err(message) = form.select_to(currency) {
                    writeln!(out, "Error: {}", message)?;
                }
            }
            Command::Quick { amount, from, to } => {
                if let Err(message) = form.select_from(from).and_then(|_| form.select_to(to)) {
                    writeln!(out, "Error: {}", message)?;
                    continue;
                }
                form.set_amount(amount);
                convert(&mut worker, &mut form, &mut out)?;
            }
            Command::Convert => convert(&mut worker, &mut form, &mut out)?,
            Command::Refresh => match worker.request_refresh(true) {
                Ok(()) => writeln!(out, "Updating...")?,
                Err(WorkerError::Busy) => writeln!(out, "{}", WorkerError::Busy)?,
                Err(e) => return Err(e.into()),
            },
            Command::Rates => {
                settle_refresh(&mut worker, &mut form, &mut out)?;
                render_rates(&form, &mut out)?;
            }
            Command::Currencies => {
                settle_refresh(&mut worker, &mut form, &mut out)?;
                let codes: Vec<String> = form.currencies().iter().map(|c| c.to_string()).collect();
                writeln!(out, "{}", codes.join(" "))?;
            }
            Command::Status => {
                if worker.is_refreshing() {
                    writeln!(out, "Updating...")?;
                } else {
                    writeln!(out, "{}", form.status_line())?;
                }
            }
        }
    }

    Ok(())
}

fn convert<W: Write>(
    worker: &mut EngineWorker,
    form: &mut ConverterForm,
    out: &mut W,
) -> anyhow::Result<()> {
    let Some((amount, from, to)) = form.selection() else {
        writeln!(out, "Error: pick both currencies first")?;
        return Ok(());
    };

    worker.request_convert(amount, &from, &to)?;

    // Replies come back in request order; anything ahead of ours is rendered first.
    loop {
        match worker.wait()? {
            Reply::Converted(result) => {
                match result {
                    Ok(conversion) => writeln!(out, "Result: {}", conversion)?,
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
                return Ok(());
            }
            reply => render_reply(form, reply, out)?,
        }
    }
}

fn settle_refresh<W: Write>(
    worker: &mut EngineWorker,
    form: &mut ConverterForm,
    out: &mut W,
) -> anyhow::Result<()> {
    while worker.is_refreshing() {
        let reply = worker.wait()?;
        render_reply(form, reply, out)?;
    }
    Ok(())
}

fn render_reply<W: Write>(form: &mut ConverterForm, reply: Reply, out: &mut W) -> anyhow::Result<()> {
    match reply {
        Reply::Refreshed {
            outcome,
            status,
            snapshot,
        } => {
            if let Err(e) = &outcome {
                writeln!(out, "Error: Failed to load rates: {}", e)?;
            }
            form.apply_refresh(status, snapshot);
            writeln!(out, "{}", form.status_line())?;
        }
        Reply::Converted(Ok(conversion)) => writeln!(out, "Result: {}", conversion)?,
        Reply::Converted(Err(e)) => writeln!(out, "Error: {}", e)?,
    }
    Ok(())
}

fn render_rates<W: Write>(form: &ConverterForm, out: &mut W) -> anyhow::Result<()> {
    match form.snapshot() {
        Some(snapshot) => write_rate_table(snapshot, out),
        None => {
            writeln!(out, "Error: {}", FxError::NoDataAvailable)?;
            Ok(())
        }
    }
}

/// Print `CODE  rate` lines in code order.
pub fn write_rate_table<W: Write>(snapshot: &RateSnapshot, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "Rates for {} (base currency per unit)", snapshot.source_date())?;
    for (currency, rate) in snapshot.rates() {
        writeln!(out, "  {:<4} {}", currency, rate)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_engine::{FxEngine, FxEngineConfig, MockRateSource};
    use rust_decimal_macros::dec;
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::TempDir;

    const FEED: &str = r#"<DataSet xmlns="http://www.bnr.ro/xsd"><Body><Cube date="2024-01-05"><Rate currency="EUR">5.0735</Rate><Rate currency="USD">4.5</Rate><Rate currency="HUF" multiplier="100">1.7205</Rate></Cube></Body></DataSet>"#;

    fn run_script(source: MockRateSource, script: &str) -> String {
        let dir = TempDir::new().unwrap();
        let config = FxEngineConfig {
            cache_path: dir.path().join("cache.json"),
            ..Default::default()
        };
        let worker = EngineWorker::spawn(FxEngine::new(Arc::new(source), config));

        let mut out = Vec::new();
        run(worker, Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("100 eur usd"),
            Ok(Command::Quick {
                amount: dec!(100),
                from: Currency::eur(),
                to: Currency::usd(),
            })
        );
        assert_eq!(parse_command("amount 2.5"), Ok(Command::Amount(dec!(2.5))));
        assert_eq!(parse_command("from huf"), Ok(Command::From(Currency::huf())));
        assert_eq!(parse_command("  refresh "), Ok(Command::Refresh));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert!(parse_command("amount lots").is_err());
        assert!(parse_command("abc EUR USD").is_err());
        assert!(parse_command("make me rich").is_err());
    }

    #[test]
    fn test_form_defaults_after_refresh() {
        let dir = TempDir::new().unwrap();
        let mut engine = FxEngine::new(
            Arc::new(MockRateSource::serving(FEED)),
            FxEngineConfig {
                cache_path: dir.path().join("cache.json"),
                ..Default::default()
            },
        );
        engine.refresh(false).unwrap();

        let mut form = ConverterForm::new();
        assert_eq!(form.status_line(), "Last update: N/A");

        form.apply_refresh(
            RateStatus::Online {
                source_date: "2024-01-05".to_string(),
            },
            engine.snapshot().cloned(),
        );

        assert_eq!(form.selection(), Some((dec!(1), Currency::eur(), Currency::ron())));
        assert_eq!(
            form.currencies(),
            vec![Currency::eur(), Currency::huf(), Currency::ron(), Currency::usd()]
        );
        assert!(form.select_to(Currency::new("XYZ")).is_err());
        assert!(form.select_to(Currency::usd()).is_ok());
    }

    #[test]
    fn test_interactive_session() {
        let output = run_script(
            MockRateSource::serving(FEED),
            "100 EUR USD\namount 1000\nfrom HUF\nto RON\nconvert\n-5 EUR USD\n1 EUR XYZ\ncurrencies\nquit\n",
        );

        assert!(output.contains("Last update: 2024-01-05 [BNR (Live)]"));
        assert!(output.contains("Result: 100 EUR = 112.7444 USD"));
        assert!(output.contains("Result: 1000 HUF = 17.205 RON"));
        assert!(output.contains("Error: Invalid amount"));
        assert!(output.contains("Error: Currency not offered: XYZ"));
        assert!(output.contains("EUR HUF RON USD\n"));
    }

    #[test]
    fn test_interactive_without_data() {
        let output = run_script(MockRateSource::offline(), "rates\nstatus\n1 EUR RON\nquit\n");

        assert!(output.contains("Error: Failed to load rates"));
        assert!(output.contains("Status: Error"));
        assert!(output.contains("Error: Could not fetch rates and no cache available"));
    }
}
