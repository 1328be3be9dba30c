//! # models::opportunity
//!
//! Scan output of the remote engine: [`Opportunity`] candidates, their
//! [`TradeLevels`], and the two batch-producing responses (`/scan` and
//! `/run_bot`).
//!
//! Opportunities are immutable once received; a new scan replaces the whole
//! batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ledger::{Direction, HistoryRecord};

// ─── Prediction ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Prediction {
    Up,
    Down,
}

// ─── Candle ───────────────────────────────────────────────────────────────────

/// One OHLC bar of the chart series (or of the predicted future path).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds.
    pub time:  i64,
    pub open:  f64,
    pub high:  f64,
    pub low:   f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

// ─── TradeLevels ──────────────────────────────────────────────────────────────

/// Planned entry / stop / target for an opportunity.
///
/// For a long: `stop_loss < entry_price < target_price`; reversed for a short.
/// The engine is responsible for the ordering; the client only derives from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry_price:  f64,
    pub stop_loss:    f64,
    pub target_price: f64,
    #[serde(default)]
    pub direction:    Option<Direction>,
    #[serde(default)]
    pub risk_reward:  Option<f64>,
    #[serde(default)]
    pub atr:          Option<f64>,
}

impl TradeLevels {
    /// Reward distance over risk distance.  `None` when the stop sits on entry.
    pub fn risk_reward(&self) -> Option<f64> {
        let risk = (self.entry_price - self.stop_loss).abs();
        if risk == 0.0 {
            return None;
        }
        Some((self.target_price - self.entry_price).abs() / risk)
    }

    /// `true` when the three levels follow the directional ordering.
    pub fn is_ordered(&self) -> bool {
        match self.direction {
            Some(Direction::Buy)  => self.stop_loss < self.entry_price && self.entry_price < self.target_price,
            Some(Direction::Sell) => self.target_price < self.entry_price && self.entry_price < self.stop_loss,
            None => false,
        }
    }
}

// ─── Opportunity ──────────────────────────────────────────────────────────────

/// A scored candidate instrument.  Not a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol:        String,
    pub score:         f64,
    pub prediction:    Prediction,
    /// Fraction in `[0, 1]` once it has passed through the ranker.
    pub confidence:    f64,
    pub current_price: f64,
    #[serde(default)]
    pub indicators:    BTreeMap<String, f64>,
    #[serde(default, rename = "chart_data")]
    pub chart_series:  Vec<Candle>,
    pub trade_levels:  TradeLevels,
    #[serde(default)]
    pub future_path:   Option<Vec<Candle>>,
    #[serde(default)]
    pub patterns:      BTreeMap<String, bool>,
}

// ─── /scan ────────────────────────────────────────────────────────────────────

/// Body of `POST /scan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbol:   String,
    pub period:   String,
    pub interval: String,
}

impl ScanRequest {
    pub fn new(symbol: impl Into<String>, period: impl Into<String>, interval: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), period: period.into(), interval: interval.into() }
    }
}

/// Decoded `/scan` response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Market snapshot that met the engine's quality bar.
    Success(Box<Opportunity>),
    /// Business rejection — never an error, never stored as trade data.
    Filtered { symbol: String, reason: String },
}

impl ScanOutcome {
    /// Success bodies carry no `status` key; filtered bodies carry placeholder
    /// market data that is dropped here.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let status = value.get("status").and_then(Value::as_str).unwrap_or("success");

        if status == "filtered" {
            let symbol = value.get("symbol").and_then(Value::as_str).unwrap_or_default();
            let reason = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Opportunity filtered by the engine");
            return Ok(ScanOutcome::Filtered { symbol: symbol.to_string(), reason: reason.to_string() });
        }

        let opportunity: Opportunity = serde_json::from_value(value)?;
        Ok(ScanOutcome::Success(Box::new(opportunity)))
    }
}

// ─── /run_bot ─────────────────────────────────────────────────────────────────

/// Body of `POST /run_bot` — one scan→select→execute cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRunResponse {
    /// `"success"` | `"no_opportunities"` | `"no_new_opportunities"`.
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Executed trade, if any.
    #[serde(default)]
    pub trade: Option<HistoryRecord>,
    #[serde(default)]
    pub total_scanned: u32,
    /// Server-ranked batch, best first.
    #[serde(default)]
    pub all_opportunities: Vec<Opportunity>,
}
