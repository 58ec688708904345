//! FxRates CLI
//!
//! Currency conversion over the BNR daily reference rates, from the
//! terminal.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fxrates_engine::{FxEngine, FxEngineConfig};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod form;
mod worker;

use worker::EngineWorker;

/// FxRates CLI
#[derive(Parser, Debug)]
#[command(name = "fxrates")]
#[command(about = "Currency converter over BNR reference rates")]
struct Args {
    /// Cache file location (overrides FX_CACHE_FILE)
    #[arg(long, global = true)]
    cache_file: Option<PathBuf>,

    /// Feed URL (overrides FX_FEED_URL)
    #[arg(long, global = true)]
    feed_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load rates and print them
    Rates {
        /// Skip a fresh cache and go to the network
        #[arg(long)]
        force: bool,
    },

    /// Convert an amount between two currencies
    Convert {
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
        from: String,
        to: String,

        /// Skip a fresh cache and go to the network
        #[arg(long)]
        force: bool,
    },

    /// Interactive converter form
    Interactive,

    /// Scripted walk through a few conversions
    Demo,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FxEngineConfig::from_env();
    if let Some(path) = args.cache_file {
        config.cache_path = path;
    }
    if let Some(url) = args.feed_url {
        config.feed_url = url;
    }

    init_logging(&config.log_level, args.log_json);

    info!(
        feed_url = %config.feed_url,
        cache_path = %config.cache_path.display(),
        "Starting FxRates"
    );

    let mut engine = FxEngine::from_config(config)?;
    let mut stdout = io::stdout().lock();

    match args.command {
        Command::Rates { force } => commands::rates(&mut engine, force, &mut stdout),
        Command::Convert {
            amount,
            from,
            to,
            force,
        } => commands::convert(&mut engine, amount, &from, &to, force, &mut stdout),
        Command::Interactive => {
            let worker = EngineWorker::spawn(engine);
            form::run(worker, io::stdin().lock(), stdout)
        }
        Command::Demo => commands::demo(&mut engine, &mut stdout),
    }
}

/// Logs go to stderr so command output stays clean on stdout.
fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}
