//! Live market ("dólar blue") rate providers.
//!
//! A quote asks its provider for a fresh buy/sell snapshot every time; nothing is
//! cached. The production provider performs a blocking HTTP call to the
//! Bluelytics API and maps every failure (transport, timeout, non-success status,
//! unexpected body) to a `MarketRateError`, which the quote engine surfaces as
//! "market rate unavailable".
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::result::Result;

/// Public endpoint with the latest official and blue rates.
pub const BLUELYTICS_URL: &str = "https://api.bluelytics.com.ar/v2/latest";
/// Default request timeout for the market rate call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A buy/sell snapshot of the market rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketRate {
    /// Price at which the market buys dollars (applied when receiving pesos).
    pub buy: f64,
    /// Price at which the market sells dollars (applied when paying with pesos).
    pub sell: f64,
    /// Provider-side update time, when the provider reports one.
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl MarketRate {
    /// Snapshot without a provider timestamp.
    pub fn new(buy: f64, sell: f64) -> Self {
        Self {
            buy,
            sell,
            updated_at: None,
        }
    }
}

/// Reasons a market rate could not be obtained.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketRateError {
    /// Connection, TLS or timeout failure.
    #[error("market rate request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success HTTP status.
    #[error("market rate provider returned status {0}")]
    Status(u16),

    /// The body could not be decoded into a buy/sell pair.
    #[error("unexpected market rate payload: {0}")]
    Malformed(String),
}

/// Source of live buy/sell rates.
pub trait MarketRateProvider: Send + Sync {
    /// Fetch a fresh snapshot; may block.
    fn fetch(&self) -> std::result::Result<MarketRate, MarketRateError>;
}

/// Provider returning a constant snapshot (offline mode and tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedMarketRate(pub MarketRate);

impl FixedMarketRate {
    /// Constant provider for the given buy/sell pair.
    pub fn new(buy: f64, sell: f64) -> Self {
        Self(MarketRate::new(buy, sell))
    }
}

impl MarketRateProvider for FixedMarketRate {
    fn fetch(&self) -> std::result::Result<MarketRate, MarketRateError> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct BluelyticsQuote {
    value_buy: f64,
    value_sell: f64,
}

#[derive(Debug, Deserialize)]
struct BluelyticsLatest {
    blue: BluelyticsQuote,
    #[serde(default)]
    last_update: Option<DateTime<FixedOffset>>,
}

/// Decode a Bluelytics `/v2/latest` body into a snapshot.
pub fn parse_bluelytics(body: &[u8]) -> std::result::Result<MarketRate, MarketRateError> {
    let latest: BluelyticsLatest =
        serde_json::from_slice(body).map_err(|e| MarketRateError::Malformed(e.to_string()))?;
    Ok(MarketRate {
        buy: latest.blue.value_buy,
        sell: latest.blue.value_sell,
        updated_at: latest.last_update,
    })
}

/// Blocking HTTP provider backed by the Bluelytics API.
pub struct BluelyticsProvider {
    client: reqwest::blocking::Client,
    url: String,
}

impl BluelyticsProvider {
    /// Build a provider for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl MarketRateProvider for BluelyticsProvider {
    fn fetch(&self) -> std::result::Result<MarketRate, MarketRateError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| MarketRateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Market rate request to {} returned {}", self.url, status);
            return Err(MarketRateError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .map_err(|e| MarketRateError::Transport(e.to_string()))?;
        let rate = parse_bluelytics(&body)?;
        debug!(
            "Market rate: buy={} sell={} updated_at={:?}",
            rate.buy, rate.sell, rate.updated_at
        );
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bluelytics_body() {
        let body = br#"{
            "oficial": {"value_avg": 905.0, "value_sell": 925.0, "value_buy": 885.0},
            "blue": {"value_avg": 1025.0, "value_sell": 1050.0, "value_buy": 1000.0},
            "oficial_euro": {"value_avg": 980.0, "value_sell": 1000.0, "value_buy": 960.0},
            "blue_euro": {"value_avg": 1110.0, "value_sell": 1135.0, "value_buy": 1085.0},
            "last_update": "2024-05-10T11:02:04.803558-03:00"
        }"#;
        let rate = parse_bluelytics(body).unwrap();
        assert_eq!(rate.buy, 1000.0);
        assert_eq!(rate.sell, 1050.0);
        assert!(rate.updated_at.is_some());
    }

    #[test]
    fn test_parse_without_timestamp() {
        let body = br#"{"blue": {"value_sell": 1050, "value_buy": 1000}}"#;
        let rate = parse_bluelytics(body).unwrap();
        assert_eq!(rate, MarketRate::new(1000.0, 1050.0));
    }

    #[test]
    fn test_parse_missing_blue_is_malformed() {
        let err = parse_bluelytics(br#"{"oficial": {}}"#).unwrap_err();
        assert!(matches!(err, MarketRateError::Malformed(_)));
    }

    #[test]
    fn test_unreachable_provider_is_transport_error() {
        let provider =
            BluelyticsProvider::new("http://127.0.0.1:9/latest", Duration::from_millis(500))
                .unwrap();
        assert!(matches!(
            provider.fetch(),
            Err(MarketRateError::Transport(_))
        ));
    }

    #[test]
    fn test_fixed_provider() {
        let rate = FixedMarketRate::new(1.0, 2.0).fetch().unwrap();
        assert_eq!((rate.buy, rate.sell), (1.0, 2.0));
    }
}
