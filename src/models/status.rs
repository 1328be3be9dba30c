//! # models::status
//!
//! Defines [`AutomationStatus`], the engine's authoritative view of the
//! automated trading loop, and the acknowledgements returned by the
//! start / stop commands.
//!
//! The client only ever holds an eventually-consistent replica of the
//! status; see [`crate::engine::status_sync`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ─── AutomationStatus ─────────────────────────────────────────────────────────

/// Snapshot of `GET /auto-trade/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationStatus {
    /// Whether the engine's automation loop is currently active.
    pub is_running: bool,

    /// When the engine last executed an automated trade.
    #[serde(default)]
    pub last_trade_time: Option<NaiveDateTime>,

    /// Trades executed by the automation loop since the engine started.
    #[serde(default)]
    pub trade_count: u32,

    /// Seconds between engine-side scans.  Always > 0.
    #[serde(rename = "scan_interval")]
    pub scan_interval_seconds: u32,
}

impl AutomationStatus {
    /// `scan_interval_seconds > 0` is the only structural invariant.
    pub fn is_valid(&self) -> bool {
        self.scan_interval_seconds > 0
    }
}

// ─── Command Acknowledgements ─────────────────────────────────────────────────

/// Body of `POST /auto-trade/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    /// `"started"` | `"already_running"` — anything else is a rejection.
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub scan_interval: Option<u32>,
}

impl StartResponse {
    /// Start is idempotent: both `started` and `already_running` count.
    pub fn is_accepted(&self) -> bool {
        matches!(self.status.as_str(), "started" | "already_running")
    }

    pub fn was_already_running(&self) -> bool {
        self.status == "already_running"
    }
}

/// Body of `POST /auto-trade/stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopResponse {
    /// `"stopped"` on success; `"not_running"` and others are rejections.
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_trades: Option<u32>,
}

impl StopResponse {
    pub fn is_stopped(&self) -> bool {
        self.status == "stopped"
    }
}

/// Generic `{ status, message? }` body returned by close / reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trade_id: Option<String>,
}

impl CommandAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
