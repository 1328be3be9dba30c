//! # models::ledger
//!
//! Defines the account **ledger**: open positions ([`ActiveTrade`]), the
//! aggregate [`AccountStats`], and immutable closed-trade snapshots
//! ([`HistoryRecord`]).
//!
//! ## Why a separate metrics type?
//! `ActiveTrade` is exactly what the engine sent — the client never edits it.
//! [`TradeMetrics`] is a pure projection computed on demand for display, so a
//! fresh fetch always yields fresh metrics with nothing to reconcile.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ─── Direction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy  => 1.0,
            Direction::Sell => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy  => f.pad("BUY"),
            Direction::Sell => f.pad("SELL"),
        }
    }
}

// ─── TradeStatus ──────────────────────────────────────────────────────────────

/// Lifecycle tag of a trade as reported by the engine.
///
/// Unknown tags are preserved verbatim so the history never loses data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TradeStatus {
    Open,
    ClosedWin,
    ClosedLoss,
    ClosedManual,
    Other(String),
}

impl TradeStatus {
    /// Anything but `OPEN` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

impl From<String> for TradeStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "OPEN"          => TradeStatus::Open,
            "CLOSED_WIN"    => TradeStatus::ClosedWin,
            "CLOSED_LOSS"   => TradeStatus::ClosedLoss,
            "CLOSED_MANUAL" => TradeStatus::ClosedManual,
            _               => TradeStatus::Other(raw),
        }
    }
}

impl From<TradeStatus> for String {
    fn from(status: TradeStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open         => f.pad("OPEN"),
            TradeStatus::ClosedWin    => f.pad("CLOSED_WIN"),
            TradeStatus::ClosedLoss   => f.pad("CLOSED_LOSS"),
            TradeStatus::ClosedManual => f.pad("CLOSED_MANUAL"),
            TradeStatus::Other(raw)   => f.pad(raw),
        }
    }
}

// ─── ActiveTrade ──────────────────────────────────────────────────────────────

/// An open position, owned by the engine and refreshed on every ledger fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTrade {
    pub trade_id:        String,
    pub symbol:          String,
    pub direction:       Direction,
    pub entry_price:     f64,
    pub current_price:   f64,
    pub stop_loss:       f64,
    pub target_price:    f64,
    pub lot_size:        f64,
    #[serde(default)]
    pub score:           f64,
    #[serde(default)]
    pub floating_pnl:    f64,
    #[serde(default)]
    pub pnl_percentage:  f64,
    #[serde(default)]
    pub risk_amount:     f64,
    #[serde(default)]
    pub risk_percentage: f64,
}

/// Display-side figures derived from an [`ActiveTrade`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeMetrics {
    /// Planned reward distance over planned risk distance.
    pub risk_reward:        Option<f64>,
    /// Price distance left before the stop is hit.
    pub distance_to_stop:   f64,
    /// Price distance left before the target is hit.
    pub distance_to_target: f64,
    /// Share of the way to target in percent; negative while moving toward
    /// the stop (-100 = at the stop).
    pub progress_pct:       f64,
    pub in_profit:          bool,
}

impl ActiveTrade {
    pub fn metrics(&self) -> TradeMetrics {
        let sign        = self.direction.sign();
        let reward_span = (self.target_price - self.entry_price).abs();
        let risk_span   = (self.entry_price - self.stop_loss).abs();
        let moved       = (self.current_price - self.entry_price) * sign;

        let progress_pct = if moved >= 0.0 {
            ratio_pct(moved, reward_span)
        } else {
            ratio_pct(moved, risk_span)
        };

        TradeMetrics {
            risk_reward:        (risk_span > 0.0).then(|| reward_span / risk_span),
            distance_to_stop:   ((self.current_price - self.stop_loss) * sign).max(0.0),
            distance_to_target: ((self.target_price - self.current_price) * sign).max(0.0),
            progress_pct,
            in_profit:          self.floating_pnl > 0.0,
        }
    }
}

fn ratio_pct(moved: f64, span: f64) -> f64 {
    if span == 0.0 {
        return 0.0;
    }
    (moved / span * 100.0).clamp(-100.0, 100.0)
}

// ─── AccountStats ─────────────────────────────────────────────────────────────

/// Aggregate account figures, recomputed by the engine on each poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountStats {
    pub balance:            f64,
    pub total_pnl:          f64,
    pub total_floating_pnl: f64,
    pub max_risk_per_trade: f64,
    pub total_daily_risk:   f64,
    /// Percent, `[0, 100]`.
    pub win_rate:           f64,
    pub total_trades:       u32,
    pub initial_balance:    Option<f64>,
    pub return_pct:         Option<f64>,
}

// ─── HistoryRecord ────────────────────────────────────────────────────────────

/// Snapshot of a trade as recorded by the engine.  Immutable once created.
///
/// The `/run_bot` response reuses this shape for the freshly opened trade
/// (status `OPEN`, no exit fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub trade_id:     String,
    pub symbol:       String,
    pub direction:    Direction,
    pub entry_price:  f64,
    #[serde(default)]
    pub exit_price:   Option<f64>,
    pub stop_loss:    f64,
    #[serde(default)]
    pub target_price: Option<f64>,
    pub lot_size:     f64,
    #[serde(default)]
    pub score:        f64,
    #[serde(default)]
    pub pnl:          f64,
    pub status:       TradeStatus,
    pub entry_time:   NaiveDateTime,
    #[serde(default)]
    pub exit_time:    Option<NaiveDateTime>,
}

impl HistoryRecord {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

// ─── HistoryFilter ────────────────────────────────────────────────────────────

/// Stateless predicate over already-fetched history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryFilter {
    #[default]
    All,
    /// `pnl > 0`
    Win,
    /// `pnl <= 0` (break-even counts as a loss)
    Loss,
}

impl HistoryFilter {
    #[inline]
    pub fn matches(self, record: &HistoryRecord) -> bool {
        match self {
            HistoryFilter::All  => true,
            HistoryFilter::Win  => record.is_win(),
            HistoryFilter::Loss => !record.is_win(),
        }
    }

    pub fn apply<'a>(self, records: &'a [HistoryRecord]) -> Vec<&'a HistoryRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL"  => Ok(HistoryFilter::All),
            "WIN"  => Ok(HistoryFilter::Win),
            "LOSS" => Ok(HistoryFilter::Loss),
            other  => Err(format!("unknown history filter '{other}' (use all, win or loss)")),
        }
    }
}

// ─── /trades ──────────────────────────────────────────────────────────────────

/// Body of `GET /trades`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerResponse {
    #[serde(default)]
    pub active_trades:  Vec<ActiveTrade>,
    #[serde(default)]
    pub recent_history: Vec<HistoryRecord>,
    #[serde(default)]
    pub stats:          AccountStats,
}
