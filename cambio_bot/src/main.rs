//! Telegram currency-exchange quoting bot.
//!
//! This binary long-polls the Telegram Bot API and answers every chat with the
//! exchange dialogue. Internally, it wires together four building blocks:
//!
//! - Telegram receiver — a teloxide dispatcher on a tokio runtime that turns
//!   messages into `Inbound` events (`/start` or plain text) tagged with the
//!   chat's `SessionId`.
//! - `Dispatcher` — owns one worker thread per live session; each worker holds the
//!   session state and replies through `TelegramTransport`, so a session's messages
//!   are handled in order while sessions run concurrently.
//! - `ActivityMonitor` checker — a background thread that reports sessions idle for
//!   longer than `--session-ttl-secs`; the dispatcher stops their workers.
//! - `BluelyticsProvider` — fetches the blue dollar buy/sell rate for each quote.
//!
//! Concurrency and shutdown:
//! - Crossbeam `select!` multiplexes inbound messages, eviction notices and the
//!   Ctrl+C signal.
//! - On Ctrl+C the dispatcher lets every worker drain its queue and joins it, then
//!   the tokio runtime is shut down.
//!
//! Usage example (CLI):
//! ```bash
//! TELEGRAM_BOT_TOKEN=123:abc cambio_bot --rates ./exchange_rates.csv
//! ```
#![warn(missing_docs)]
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cambio_common::activity::ActivityMonitor;
use cambio_common::config::normalize_path;
use cambio_common::dialogue::{Dialogue, SessionId};
use cambio_common::market::BluelyticsProvider;
use cambio_common::{CambioError, RateTable, Result};
use clap::Parser;
use crossbeam_channel::{Sender, select, unbounded};
use log::{error, info, warn};
use teloxide::Bot;

use crate::args::Args;
use crate::dispatcher::Dispatcher;
use crate::telegram::{Inbound, TelegramTransport};

mod args;
mod dispatcher;
mod telegram;

/// How often idle sessions are looked for.
const EVICTION_CHECK_INTERVAL: Duration = Duration::from_secs(1);
/// Time granted to in-flight Telegram requests when the runtime stops.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let rates = Arc::new(RateTable::load(&normalize_path(&args.rates))?);
    if rates.is_empty() {
        warn!("Rate table is empty; every quote will fail");
    }
    let market = Arc::new(BluelyticsProvider::new(
        args.market_url.clone(),
        args.market_timeout(),
    )?);
    let dialogue = Dialogue::new(rates, market);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let bot = Bot::new(&args.token);
    let transport = Arc::new(TelegramTransport::new(bot.clone(), runtime.handle().clone()));

    let (inbound_tx, inbound_rx) = unbounded::<Inbound>();
    runtime.spawn(telegram::receive_loop_with_channel(bot, inbound_tx));

    let activity = Arc::new(Mutex::new(ActivityMonitor::new(args.session_ttl())));
    let (evict_tx, evict_rx) = unbounded::<SessionId>();
    let activity_for_checker = Arc::clone(&activity);
    thread::spawn(move || {
        start_eviction_checker(activity_for_checker, evict_tx);
    });

    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down bot...");
        let _ = stop_tx.send(());
    })
    .map_err(|e| CambioError::Io(std::io::Error::other(e.to_string())))?;

    let mut dispatcher = Dispatcher::new(dialogue, transport, activity);
    info!("Bot is running. Press Ctrl+C to exit.");

    loop {
        select! {
            recv(inbound_rx) -> msg => match msg {
                Ok(inbound) => if let Err(e) = dispatcher.route(inbound) {
                    error!("Failed to route message: {}", e);
                },
                Err(_) => {
                    warn!("Receiver stopped; no more messages will arrive");
                    break;
                }
            },
            recv(evict_rx) -> id => if let Ok(id) = id {
                if let Err(e) = dispatcher.evict(id) {
                    error!("Failed to evict session {}: {}", id, e);
                }
            },
            recv(stop_rx) -> _ => break,
        }
    }

    info!("{} sessions active at shutdown", dispatcher.active_sessions());
    dispatcher.shutdown();
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    Ok(())
}

fn start_eviction_checker(activity: Arc<Mutex<ActivityMonitor>>, evict_tx: Sender<SessionId>) {
    loop {
        thread::sleep(EVICTION_CHECK_INTERVAL);
        let idle = match activity.lock() {
            Ok(mut monitor) => monitor.check_timeouts(),
            Err(e) => {
                error!("Activity monitor lock poisoned: {}", e);
                return;
            }
        };
        for id in idle {
            if evict_tx.send(id).is_err() {
                return;
            }
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
