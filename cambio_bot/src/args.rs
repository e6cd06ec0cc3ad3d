//! Command-line arguments for the Telegram bot.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::time::Duration;

use cambio_common::activity::DEFAULT_SESSION_TTL_SECS;
use cambio_common::config::DEFAULT_RATES_PATH;
use cambio_common::market::{BLUELYTICS_URL, DEFAULT_TIMEOUT_SECS};
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Bot token issued by @BotFather.
    #[clap(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Path to the CSV file with the `Origen`, `Destino` and `comision final` columns.
    #[clap(long, default_value = DEFAULT_RATES_PATH)]
    pub rates: String,

    /// Endpoint returning the latest blue dollar rates.
    #[clap(long, default_value = BLUELYTICS_URL)]
    pub market_url: String,

    /// Seconds to wait for the market rate before reporting it unavailable.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub market_timeout_secs: u64,

    /// Seconds of inactivity after which a conversation is forgotten.
    #[clap(long, default_value_t = DEFAULT_SESSION_TTL_SECS)]
    pub session_ttl_secs: u64,
}

impl Args {
    /// Market rate request timeout.
    pub fn market_timeout(&self) -> Duration {
        Duration::from_secs(self.market_timeout_secs)
    }

    /// Idle time before a session is evicted.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
