//! Configuration helpers shared by the binaries.
use std::path::PathBuf;

/// Rate table file used when no `--rates` flag is given.
pub const DEFAULT_RATES_PATH: &str = "exchange_rates.csv";

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
pub fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("  rates.csv "), PathBuf::from("rates.csv"));
        assert_eq!(
            normalize_path("\"C:\\data\\rates.csv\""),
            PathBuf::from("C:\\data\\rates.csv")
        );
        assert_eq!(normalize_path("\"unbalanced"), PathBuf::from("\"unbalanced"));
    }
}
