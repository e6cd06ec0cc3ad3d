//! Error types shared between the bot and the console.
//!
//! The `CambioError` enum unifies infrastructure failures (I/O, CSV loading,
//! HTTP, JSON, channel communication and locking) so every crate can propagate a
//! single error type. Per-request dialogue failures that the user can recover
//! from live in [`crate::quote::QuoteError`] instead.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by the bot and the console.
#[derive(Error, Debug)]
pub enum CambioError {
    /// I/O error originating from the standard library, files or stdin/stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while reading the rate table CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rate table content that is readable but invalid (missing column, bad number).
    #[error("Rate table error: {0}")]
    RateTable(String),

    /// HTTP transport failure (connect, timeout, non-success status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// The Telegram Bot API answered with `ok: false`.
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for CambioError {
    fn from(err: PoisonError<T>) -> Self {
        CambioError::MutexLock(err.to_string())
    }
}
