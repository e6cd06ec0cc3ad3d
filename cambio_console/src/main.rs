//! Cambio Console — a terminal front-end for the exchange quoting dialogue.
//!
//! It loads the same rate table as the bot and drives one local conversation from
//! stdin, printing replies and keyboards to stdout. Quotes use the live blue dollar
//! rate unless a fixed `--buy`/`--sell` pair is given.
//!
//! Usage example (CLI):
//! ```bash
//! cambio_console --rates ./exchange_rates.csv --buy 1000 --sell 1050
//! ```
//!
//! Type `/start` to restart and `/salir` to leave.
#![warn(missing_docs)]
mod args;
mod console;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use cambio_common::activity::DEFAULT_SESSION_TTL_SECS;
use cambio_common::config::normalize_path;
use cambio_common::dialogue::Dialogue;
use cambio_common::market::{BluelyticsProvider, FixedMarketRate, MarketRateProvider};
use cambio_common::session::SessionStore;
use cambio_common::{RateTable, Result};
use clap::Parser;
use log::info;

use crate::args::Args;
use crate::console::ConsoleTransport;

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let rates = Arc::new(RateTable::load(&normalize_path(&args.rates))?);
    let market: Arc<dyn MarketRateProvider> = match args.fixed_rate() {
        Some((buy, sell)) => {
            info!("Offline mode: buy={} sell={}", buy, sell);
            Arc::new(FixedMarketRate::new(buy, sell))
        }
        None => Arc::new(BluelyticsProvider::new(
            args.market_url.clone(),
            args.market_timeout(),
        )?),
    };

    let mut store = SessionStore::new(
        Dialogue::new(rates, market),
        Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
    );
    let transport = ConsoleTransport::new(io::stdout());
    console::run(io::stdin().lock(), &mut store, &transport)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
