//! Commission reference table loaded once at startup.
//!
//! The table maps an (origin, destination) pair to the commission percentage that
//! is applied to a quoted amount. It is read from a CSV file whose header carries
//! the columns `Origen`, `Destino` and `comision final`; any other column is
//! ignored. Labels are trimmed and lower-cased on load so they compare equal to
//! the normalised text users send back from the keyboards.
//!
//! Once built, a `RateTable` is immutable and is shared behind an `Arc` by every
//! session.
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::CambioError;
use crate::result::Result;

/// Header of the origin label column.
pub const ORIGIN_COLUMN: &str = "Origen";
/// Header of the destination label column.
pub const DESTINATION_COLUMN: &str = "Destino";
/// Header of the commission percentage column.
pub const COMMISSION_COLUMN: &str = "comision final";

/// Lookup of the commission percentage for an exact (origin, destination) pair.
pub trait RateLookup {
    /// Returns the commission percentage, or `None` if the pair is unknown.
    fn rate_for(&self, origin: &str, destination: &str) -> Option<f64>;
}

/// A single row of the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEntry {
    /// Source currency or balance type, normalised.
    pub origin: String,
    /// Target currency or balance type, normalised.
    pub destination: String,
    /// Percentage applied to the amount (e.g. `95.0` keeps 95%).
    pub commission_percent: f64,
}

/// Read-only reference table of commission rates.
#[derive(Debug, Default, Clone)]
pub struct RateTable {
    entries: Vec<RateEntry>,
    index: HashMap<(String, String), usize>,
}

/// Normalise a label the same way user input is normalised.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl RateTable {
    /// Build a table from already parsed entries.
    ///
    /// The first entry for a pair wins; later duplicates are dropped with a warning.
    pub fn from_entries(entries: impl IntoIterator<Item = RateEntry>) -> Self {
        let mut table = RateTable::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Open and parse the CSV file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        info!(
            "Loaded {} rate entries ({} origins) from {}",
            table.len(),
            table.distinct_origins().len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse CSV content from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let origin_idx = column_index(&headers, ORIGIN_COLUMN)?;
        let destination_idx = column_index(&headers, DESTINATION_COLUMN)?;
        let commission_idx = column_index(&headers, COMMISSION_COLUMN)?;

        let mut table = RateTable::default();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let origin = normalize_label(record.get(origin_idx).unwrap_or_default());
            let destination = normalize_label(record.get(destination_idx).unwrap_or_default());
            if origin.is_empty() || destination.is_empty() {
                debug!("Skipping line {}: missing origin or destination", line);
                continue;
            }

            let raw_commission = record.get(commission_idx).unwrap_or_default();
            if raw_commission.is_empty() {
                warn!(
                    "Skipping line {} ({} -> {}): empty commission",
                    line, origin, destination
                );
                continue;
            }
            let commission_percent = parse_percent(raw_commission).ok_or_else(|| {
                CambioError::RateTable(format!(
                    "line {}: invalid commission '{}' for {} -> {}",
                    line, raw_commission, origin, destination
                ))
            })?;

            table.insert(RateEntry {
                origin,
                destination,
                commission_percent,
            });
        }
        Ok(table)
    }

    fn insert(&mut self, entry: RateEntry) {
        let key = (entry.origin.clone(), entry.destination.clone());
        if self.index.contains_key(&key) {
            warn!(
                "Duplicate rate for {} -> {}; keeping the first one",
                entry.origin, entry.destination
            );
            return;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
    }

    /// Every distinct origin, in order of first appearance.
    pub fn distinct_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !origins.contains(&entry.origin) {
                origins.push(entry.origin.clone());
            }
        }
        origins
    }

    /// Every destination paired with `origin`, in order of first appearance.
    pub fn destinations_for(&self, origin: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.origin == origin)
            .map(|entry| entry.destination.clone())
            .collect()
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the table has no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RateLookup for RateTable {
    fn rate_for(&self, origin: &str, destination: &str) -> Option<f64> {
        self.index
            .get(&(origin.to_string(), destination.to_string()))
            .map(|&idx| self.entries[idx].commission_percent)
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CambioError::RateTable(format!("missing column '{}'", name)))
}

/// Accepts both `95.5` and the decimal comma form `95,5`.
fn parse_percent(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
