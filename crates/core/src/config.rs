use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// PostgreSQL connection URL. Persistence is skipped by the runner when unset.
    pub database_url: Option<String>,

    /// Directory holding the weekly holder extracts.
    pub snapshot_dir: PathBuf,

    /// Glob pattern (relative to `snapshot_dir`) selecting extract files.
    pub snapshot_pattern: String,

    /// Normalized transaction feed produced by the chain fetcher.
    pub feed_path: PathBuf,

    /// Whether the fetcher delivered the full window. `false` marks results partial.
    pub feed_complete: bool,

    /// Where CSV result tables are written.
    pub output_dir: PathBuf,

    /// First calendar day of the discount program.
    pub activity_start: NaiveDate,

    /// Instant the week-1 snapshot was taken.
    pub first_snapshot_at: DateTime<Utc>,

    /// Length of one snapshot window, in days.
    pub snapshot_period_days: u32,

    /// Only classify payers that appear in at least one weekly snapshot.
    pub holders_only: bool,

    /// Seconds between scheduled refresh passes.
    pub refresh_interval_secs: u64,

    /// Seconds to wait before retrying a failed pass.
    pub retry_delay_secs: u64,

    /// Port for the API server.
    pub api_port: u16,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup, applying defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let activity_start = NaiveDate::parse_from_str(&get("ACTIVITY_START", "2025-07-21"), "%Y-%m-%d")
            .map_err(|e| eyre::eyre!("ACTIVITY_START: {e}"))?;
        let first_snapshot_at = DateTime::parse_from_rfc3339(&get("FIRST_SNAPSHOT_AT", "2025-07-21T08:00:00Z"))
            .map_err(|e| eyre::eyre!("FIRST_SNAPSHOT_AT: {e}"))?
            .with_timezone(&Utc);

        let snapshot_period_days: u32 = get("SNAPSHOT_PERIOD_DAYS", "7").parse()?;
        if snapshot_period_days == 0 {
            eyre::bail!("SNAPSHOT_PERIOD_DAYS must be positive");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            snapshot_dir: get("SNAPSHOT_DIR", ".").into(),
            snapshot_pattern: get("SNAPSHOT_PATTERN", "nft-owners-*.tsv"),
            feed_path: get("FEED_PATH", "chain_data_cache.csv").into(),
            feed_complete: parse_flag(&get("FEED_COMPLETE", "true"))?,
            output_dir: get("OUTPUT_DIR", ".").into(),
            activity_start,
            first_snapshot_at,
            snapshot_period_days,
            holders_only: parse_flag(&get("HOLDERS_ONLY", "false"))?,
            refresh_interval_secs: get("REFRESH_INTERVAL_SECS", "1800").parse()?,
            retry_delay_secs: get("RETRY_DELAY_SECS", "300").parse()?,
            api_port: get("API_PORT", "3000").parse()?,
        })
    }
}

fn parse_flag(raw: &str) -> eyre::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(eyre::eyre!("invalid boolean flag: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> eyre::Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.snapshot_pattern, "nft-owners-*.tsv");
        assert_eq!(settings.activity_start, NaiveDate::from_ymd_opt(2025, 7, 21).unwrap());
        assert_eq!(settings.first_snapshot_at.to_rfc3339(), "2025-07-21T08:00:00+00:00");
        assert_eq!(settings.snapshot_period_days, 7);
        assert!(settings.feed_complete);
        assert!(!settings.holders_only);
        assert_eq!(settings.refresh_interval_secs, 1800);
        assert_eq!(settings.api_port, 3000);
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgres://localhost/vip"),
            ("HOLDERS_ONLY", "yes"),
            ("FEED_COMPLETE", "0"),
            ("SNAPSHOT_PERIOD_DAYS", "14"),
        ])
        .unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/vip"));
        assert!(settings.holders_only);
        assert!(!settings.feed_complete);
        assert_eq!(settings.snapshot_period_days, 14);
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let settings = settings_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(settings.database_url.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(settings_from(&[("SNAPSHOT_PERIOD_DAYS", "0")]).is_err());
        assert!(settings_from(&[("ACTIVITY_START", "21/07/2025")]).is_err());
        assert!(settings_from(&[("HOLDERS_ONLY", "maybe")]).is_err());
        assert!(settings_from(&[("API_PORT", "http")]).is_err());
    }
}
