//! Command-line arguments for the console client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::time::Duration;

use cambio_common::config::DEFAULT_RATES_PATH;
use cambio_common::market::{BLUELYTICS_URL, DEFAULT_TIMEOUT_SECS};
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the CSV file with the `Origen`, `Destino` and `comision final` columns.
    #[clap(long, default_value = DEFAULT_RATES_PATH)]
    pub rates: String,

    /// Endpoint returning the latest blue dollar rates.
    #[clap(long, default_value = BLUELYTICS_URL)]
    pub market_url: String,

    /// Seconds to wait for the market rate before reporting it unavailable.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub market_timeout_secs: u64,

    /// Offline mode: fixed buy rate instead of the live market (needs `--sell`).
    #[clap(long, requires = "sell")]
    pub buy: Option<f64>,

    /// Offline mode: fixed sell rate instead of the live market (needs `--buy`).
    #[clap(long, requires = "buy")]
    pub sell: Option<f64>,
}

impl Args {
    /// Market rate request timeout.
    pub fn market_timeout(&self) -> Duration {
        Duration::from_secs(self.market_timeout_secs)
    }

    /// Fixed buy/sell pair when running offline.
    pub fn fixed_rate(&self) -> Option<(f64, f64)> {
        self.buy.zip(self.sell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_by_default() {
        let args = Args::try_parse_from(["cambio_console"]).unwrap();
        assert_eq!(args.fixed_rate(), None);
        assert_eq!(args.market_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_offline_pair() {
        let args =
            Args::try_parse_from(["cambio_console", "--buy", "1000", "--sell", "1050"]).unwrap();
        assert_eq!(args.fixed_rate(), Some((1000.0, 1050.0)));
    }

    #[test]
    fn test_buy_requires_sell() {
        assert!(Args::try_parse_from(["cambio_console", "--buy", "1000"]).is_err());
    }
}
