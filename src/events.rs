//! # events
//!
//! Defines [`Notification`] — every terminal outcome the client surfaces to
//! the user — and [`NotificationSink`], the broadcast channel the UI (here,
//! the console) subscribes to.
//!
//! Emitting never fails: with no subscriber attached the event is dropped,
//! which keeps headless runs and tests quiet.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::{ClientError, ErrorKind};
use crate::models::Direction;

/// Buffered events per subscriber before the slowest one starts lagging.
const SINK_CAPACITY: usize = 256;

// ─── Severity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Success,
    /// Business outcome that is not an error (engine quality bar).
    Filtered,
    Error,
    Info,
}

// ─── Notification ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// Automation accepted by the engine (`started` or `already_running`).
    AutomationStarted {
        already_running: bool,
    },

    /// Automation stopped; total trades executed by the loop.
    AutomationStopped {
        total_trades: u32,
    },

    /// A cycle opened a trade.
    TradeExecuted {
        symbol:        String,
        direction:     Direction,
        total_scanned: u32,
    },

    /// A cycle finished without opening a trade.
    CycleFiltered {
        reason: String,
    },

    /// A cycle answered after automation stopped; its result was dropped.
    CycleDiscarded {
        cycle_id: String,
    },

    /// A one-shot scan produced a market snapshot.
    ScanCompleted {
        symbol: String,
        score:  f64,
    },

    /// A one-shot scan was rejected by the engine's quality bar.
    ScanFiltered {
        symbol: String,
        reason: String,
    },

    TradeClosed {
        trade_id: String,
    },

    /// Server confirmation of an account reset, verbatim.
    AccountReset {
        message: String,
    },

    /// Engine unreachable, non-2xx or malformed body.  Non-fatal.
    TransportError {
        operation: String,
        message:   String,
    },

    /// A command came back with an unexpected status.
    CommandFailed {
        operation: String,
        message:   String,
    },
}

impl Notification {
    pub fn severity(&self) -> Severity {
        match self {
            Notification::AutomationStarted { .. }
            | Notification::AutomationStopped { .. }
            | Notification::TradeExecuted { .. }
            | Notification::ScanCompleted { .. }
            | Notification::TradeClosed { .. }
            | Notification::AccountReset { .. } => Severity::Success,
            Notification::CycleFiltered { .. } | Notification::ScanFiltered { .. } => Severity::Filtered,
            Notification::TransportError { .. } | Notification::CommandFailed { .. } => Severity::Error,
            Notification::CycleDiscarded { .. } => Severity::Info,
        }
    }

    /// Converts a failed remote call into the matching error event.
    pub fn from_error(operation: &str, err: &ClientError) -> Self {
        let operation = err.operation().unwrap_or(operation).to_string();
        match err.kind() {
            ErrorKind::Command => Notification::CommandFailed { operation, message: err.to_string() },
            ErrorKind::Transport | ErrorKind::Config => {
                Notification::TransportError { operation, message: err.to_string() }
            }
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Notification::AutomationStarted { already_running: true } => {
                "Auto-trading was already running".to_string()
            }
            Notification::AutomationStarted { already_running: false } => "Auto-trading started".to_string(),
            Notification::AutomationStopped { total_trades } => {
                format!("Auto-trading stopped. Total trades: {total_trades}")
            }
            Notification::TradeExecuted { symbol, direction, total_scanned } => {
                format!("Executed {direction} on {symbol} ({total_scanned} pairs scanned)")
            }
            Notification::CycleFiltered { reason } => format!("No trade this cycle: {reason}"),
            Notification::CycleDiscarded { cycle_id } => {
                format!("Cycle {cycle_id} finished after automation stopped; result ignored")
            }
            Notification::ScanCompleted { symbol, score } => format!("{symbol} scanned (score {score:.1})"),
            Notification::ScanFiltered { symbol, reason } => format!("{symbol} filtered: {reason}"),
            Notification::TradeClosed { trade_id } => format!("Trade {trade_id} closed"),
            Notification::AccountReset { message } => message.clone(),
            Notification::TransportError { operation, message } => format!("[{operation}] {message}"),
            Notification::CommandFailed { operation, message } => format!("[{operation}] {message}"),
        }
    }

    /// JSON form, for log shipping or a WebSocket bridge.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

// ─── NotificationSink ─────────────────────────────────────────────────────────

/// Cheap-to-clone handle every component reports through.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: broadcast::Sender<Notification>,
}

impl NotificationSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SINK_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, event: Notification) {
        tracing::debug!(event = %event.to_json(), "notification");
        // Err only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    pub fn report_error(&self, operation: &str, err: &ClientError) {
        self.notify(Notification::from_error(operation, err));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}
