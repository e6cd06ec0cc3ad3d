//!
//! Currency-exchange quoting core shared by the Telegram bot and the console.
//!
//! This crate aggregates:
//! - `error` — unified error type `CambioError` used across the workspace.
//! - `result` — handy `Result<T, CambioError>` alias.
//! - `config` — defaults and path helpers for the binaries.
//! - `rate_table` — commission reference table loaded from CSV.
//! - `market` — live buy/sell market rate providers.
//! - `quote` — quote computation and its recoverable errors.
//! - `messages` — user-facing texts and keyboard layout.
//! - `dialogue` — per-session state machine.
//! - `activity` — idle-session tracking.
//! - `session` — single-owner session store.
//! - `transport` — outbound transport trait.
#![warn(missing_docs)]
pub mod activity;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod market;
pub mod messages;
pub mod quote;
pub mod rate_table;
pub mod result;
pub mod session;
pub mod transport;

pub use dialogue::{Dialogue, Event, Reply, Session, SessionId, Stage};
pub use error::CambioError;
pub use rate_table::RateTable;
pub use result::Result;
pub use transport::Transport;
