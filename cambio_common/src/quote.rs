//! Quote computation.
//!
//! A quote multiplies the requested amount by the pair's commission percentage and,
//! when one side of the exchange is a pesos balance, by the live market rate:
//!
//! - origin label contains `pesos`: the market `sell` price applies;
//! - otherwise destination label contains `pesos`: the market `buy` price applies;
//! - otherwise the multiplier is `1`.
//!
//! The `pesos` test is a substring match on the normalised labels, so any label
//! containing it (e.g. `pesos mercadopago`) takes the market rate.
//!
//! `compute` does no I/O of its own; the rate table and the market provider are
//! injected, and retrying is left to the caller.
use log::debug;
use thiserror::Error;

use crate::market::{MarketRateError, MarketRateProvider};
use crate::rate_table::RateLookup;

/// Label fragment that triggers the market rate.
pub const PESOS: &str = "pesos";

/// Recoverable failures while quoting; the session stays at the amount stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// The amount text is not a finite number.
    #[error("invalid amount: {0:?}")]
    InvalidAmountFormat(String),

    /// The live market rate could not be fetched.
    #[error("market rate unavailable: {0}")]
    MarketRateUnavailable(#[from] MarketRateError),

    /// The reference table has no commission for the pair.
    #[error("no rate for {origin} -> {destination}")]
    NoRateForPair {
        /// Requested origin.
        origin: String,
        /// Requested destination.
        destination: String,
    },
}

/// A computed quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResult {
    /// Amount requested by the user.
    pub amount: f64,
    /// Origin label.
    pub origin: String,
    /// Destination label.
    pub destination: String,
    /// Amount the user receives.
    pub value: f64,
}

/// Parse the user's amount text into a finite number.
pub fn parse_amount(text: &str) -> Result<f64, QuoteError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| QuoteError::InvalidAmountFormat(text.to_string()))
}

/// Multiplier applied on top of the commission for a given pair and snapshot.
pub fn market_multiplier(origin: &str, destination: &str, buy: f64, sell: f64) -> f64 {
    if origin.contains(PESOS) {
        sell
    } else if destination.contains(PESOS) {
        buy
    } else {
        1.0
    }
}

/// Compute a quote for `amount` from `origin` to `destination`.
///
/// The market rate is fetched before the pair is looked up, so a failing provider
/// is reported even for pairs that would not use it.
pub fn compute<L, M>(
    origin: &str,
    destination: &str,
    amount: f64,
    rates: &L,
    market: &M,
) -> Result<QuoteResult, QuoteError>
where
    L: RateLookup + ?Sized,
    M: MarketRateProvider + ?Sized,
{
    let snapshot = market.fetch()?;
    let multiplier = market_multiplier(origin, destination, snapshot.buy, snapshot.sell);

    let commission_percent = rates.rate_for(origin, destination).ok_or_else(|| {
        QuoteError::NoRateForPair {
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    })?;

    let value = amount * (commission_percent / 100.0) * multiplier;
    debug!(
        "Quote {} {} -> {}: commission={}% multiplier={} value={}",
        amount, origin, destination, commission_percent, multiplier, value
    );

    Ok(QuoteResult {
        amount,
        origin: origin.to_string(),
        destination: destination.to_string(),
        value,
    })
}
