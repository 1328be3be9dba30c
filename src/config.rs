//! # config — read client configuration from environment variables
//!
//! The base URL is resolved and normalised exactly once here; every component
//! receives the finished [`Config`] and never re-reads the environment.

use std::time::Duration;

use reqwest::Url;
use tracing::warn;

use crate::error::ClientError;
use crate::models::ScanRequest;

/// Origin assumed for a relative base URL when `TRADING_ORIGIN` is unset.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Everything the client needs at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute, normalised engine base, always ending in `/api`.
    pub base_url:              String,
    pub status_poll_interval:  Duration,
    pub ledger_poll_interval:  Duration,
    /// Automation cycle period while intent is `Running`.
    pub cycle_interval:        Duration,
    pub request_timeout:       Duration,
    /// Symbol used for manual scans and the scan that follows a reset.
    pub default_symbol:        String,
    pub scan_period:           String,
    pub scan_interval:         String,
    pub auto_start:            bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base = lookup("TRADING_API_URL").unwrap_or_default();
        let origin = match lookup("TRADING_ORIGIN") {
            Some(origin) => origin,
            None => {
                let normalized = normalize_base_url(&raw_base);
                if normalized.starts_with('/') {
                    warn!(origin = DEFAULT_ORIGIN, base = %normalized, "TRADING_ORIGIN not set — resolving relative base against default origin");
                }
                DEFAULT_ORIGIN.to_string()
            }
        };

        Ok(Self {
            base_url:             resolve_base_url(&raw_base, &origin)?,
            status_poll_interval: secs(&lookup, "STATUS_POLL_SECS", 5)?,
            ledger_poll_interval: secs(&lookup, "LEDGER_POLL_SECS", 5)?,
            cycle_interval:       secs(&lookup, "AUTO_CYCLE_SECS", 60)?,
            request_timeout:      secs(&lookup, "REQUEST_TIMEOUT_SECS", 60)?,
            default_symbol:       lookup("DEFAULT_SYMBOL").unwrap_or_else(|| "EURUSD".to_string()).to_uppercase(),
            scan_period:          lookup("SCAN_PERIOD").unwrap_or_else(|| "1mo".to_string()),
            scan_interval:        lookup("SCAN_INTERVAL").unwrap_or_else(|| "15m".to_string()),
            auto_start:           lookup("AUTO_START").map(|v| v == "true" || v == "1").unwrap_or(false),
        })
    }

    /// Scan request for `symbol` with the configured period/interval.
    pub fn scan_request(&self, symbol: &str) -> ScanRequest {
        ScanRequest::new(symbol.to_uppercase(), &self.scan_period, &self.scan_interval)
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ClientError::Config(format!("{key} must be a whole number of seconds, got '{raw}'")))?,
        None => default,
    };
    if value == 0 {
        return Err(ClientError::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(value))
}

// ─── Base URL ─────────────────────────────────────────────────────────────────

/// Trim, strip stray quoting, drop trailing slashes, enforce the `/api` suffix.
///
/// Empty input yields the same-origin default `/api`.
pub fn normalize_base_url(raw: &str) -> String {
    let unquoted = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    let mut base = unquoted.trim_end_matches('/').to_string();

    if !base.ends_with("/api") {
        base.push_str("/api");
    }
    base
}

/// Normalise `raw`, then make it absolute against `origin` when relative.
pub fn resolve_base_url(raw: &str, origin: &str) -> Result<String, ClientError> {
    let normalized = normalize_base_url(raw);

    let absolute = if normalized.starts_with('/') {
        format!("{}{normalized}", origin.trim().trim_end_matches('/'))
    } else {
        normalized
    };

    let url = Url::parse(&absolute)
        .map_err(|e| ClientError::Config(format!("invalid engine base URL '{absolute}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "engine base URL '{absolute}' must use http or https"
        )));
    }
    Ok(absolute)
}
