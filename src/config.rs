use rust_decimal::Decimal;

use crate::error::{AppError, Result};

/// Floor applied to every point estimate before range bounds are computed.
pub const MIN_ESTIMATE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Flat estimate used by the generic fallback tier.
pub const GENERIC_ESTIMATE: Decimal = Decimal::from_parts(450, 0, 0, false, 0);

/// Snapshot watcher poll interval (seconds).
pub const PASS_INTERVAL_SECS: u64 = 300;

/// Default number of entries in the top-deals ranking.
pub const TOP_DEALS_LIMIT: usize = 10;

/// Default trend window in days. 0 disables the cutoff.
pub const HISTORY_WINDOW_DAYS: i64 = 90;

/// Longest accepted trend window (about a century).
pub const MAX_HISTORY_WINDOW_DAYS: i64 = 36_500;

/// Range widths (fraction of the estimate) for the tiers that don't carry their own.
pub mod range_widths {
    use rust_decimal::Decimal;

    pub const CALIBER_FALLBACK: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
    pub const GENERIC_FALLBACK: Decimal = Decimal::from_parts(40, 0, 0, false, 2);
}

/// Condition multipliers applied to the base estimate.
pub mod condition_multipliers {
    use rust_decimal::Decimal;

    pub const NEW: Decimal = Decimal::from_parts(115, 0, 0, false, 2);
    pub const USED_GOOD: Decimal = Decimal::from_parts(100, 0, 0, false, 2);
    pub const USED_FAIR: Decimal = Decimal::from_parts(85, 0, 0, false, 2);
}

/// Sane bounds for scraped listing prices. Rows outside are kept but logged.
pub mod price_sanity {
    use rust_decimal::Decimal;

    pub const MIN: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
    pub const MAX: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);
}

/// Character limits on scraped text fields. Identity fields and URLs over the limit reject
/// the row; free text is truncated.
pub mod field_limits {
    pub const MANUFACTURER: usize = 50;
    pub const MODEL: usize = 50;
    pub const CALIBER: usize = 30;
    pub const SECTION: usize = 50;
    pub const DESCRIPTION: usize = 500;
    pub const URL: usize = 2048;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// JSON snapshot written by the scraper (SNAPSHOT_PATH). No passes run when unset.
    pub snapshot_path: Option<String>,
    /// How often the watcher checks the snapshot file (PASS_INTERVAL_SECS)
    pub pass_interval_secs: u64,
    /// Size of the top-deals ranking (TOP_DEALS_LIMIT)
    pub top_deals_limit: usize,
    /// Trend series only include points newer than this many days (HISTORY_WINDOW_DAYS, 0 = all)
    pub history_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            snapshot_path: std::env::var("SNAPSHOT_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            pass_interval_secs: std::env::var("PASS_INTERVAL_SECS")
                .unwrap_or_else(|_| PASS_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("PASS_INTERVAL_SECS must be a whole number of seconds".to_string()))?
                .max(1),
            top_deals_limit: std::env::var("TOP_DEALS_LIMIT")
                .unwrap_or_else(|_| TOP_DEALS_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(TOP_DEALS_LIMIT),
            history_window_days: match std::env::var("HISTORY_WINDOW_DAYS") {
                Ok(raw) => parse_history_window_days(&raw)?,
                Err(_) => HISTORY_WINDOW_DAYS,
            },
        })
    }
}

/// Whole days in `0..=MAX_HISTORY_WINDOW_DAYS`.
pub fn parse_history_window_days(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| (0..=MAX_HISTORY_WINDOW_DAYS).contains(days))
        .ok_or_else(|| {
            AppError::Config(format!(
                "HISTORY_WINDOW_DAYS must be a whole number between 0 and {MAX_HISTORY_WINDOW_DAYS}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_window_is_bounded() {
        assert_eq!(parse_history_window_days(" 30 ").unwrap(), 30);
        assert_eq!(parse_history_window_days("0").unwrap(), 0);
        assert!(parse_history_window_days("-1").is_err());
        assert!(parse_history_window_days("1000000000000").is_err());
        assert!(parse_history_window_days("ninety").is_err());
    }
}
