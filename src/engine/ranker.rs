//! # engine::ranker
//!
//! Turns a scan batch into an ordered, selectable board.
//!
//! The engine is the scorer: the board keeps the server's order and never
//! re-sorts.  The first entry is focused by default; focusing another symbol
//! is a local change only.

use serde::Serialize;

use crate::models::{BotRunResponse, Direction, Opportunity};

/// Normalises a confidence reported either as a fraction or in percent.
pub fn normalize_confidence(confidence: f64) -> f64 {
    let fraction = if confidence > 1.0 { confidence / 100.0 } else { confidence };
    fraction.clamp(0.0, 1.0)
}

// ─── RankedOpportunities ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedOpportunities {
    items:    Vec<Opportunity>,
    selected: Option<usize>,
}

impl RankedOpportunities {
    pub fn from_batch(batch: Vec<Opportunity>) -> Self {
        let items: Vec<Opportunity> = batch
            .into_iter()
            .map(|mut o| {
                o.confidence = normalize_confidence(o.confidence);
                o
            })
            .collect();
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    pub fn items(&self) -> &[Opportunity] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected(&self) -> Option<&Opportunity> {
        self.selected.and_then(|i| self.items.get(i))
    }

    /// Focus the first entry for `symbol` (case-insensitive).  Unknown symbols
    /// leave the focus where it was.
    pub fn select(&mut self, symbol: &str) -> bool {
        match self.items.iter().position(|o| o.symbol.eq_ignore_ascii_case(symbol)) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }
}

// ─── Cycle outcome ────────────────────────────────────────────────────────────

/// Discriminator for one `/run_bot` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    /// A trade was opened this cycle.
    Executed {
        symbol:        String,
        direction:     Direction,
        total_scanned: u32,
    },
    /// Nothing met the engine's quality bar.  Not an error.
    Filtered { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBatch {
    pub status:        BatchStatus,
    pub opportunities: RankedOpportunities,
}

/// Ranks one cycle response.
///
/// `success` without a trade body is still reported as filtered: there is
/// nothing executed to show.
pub fn rank_cycle(response: BotRunResponse) -> RankedBatch {
    let BotRunResponse { status, message, trade, total_scanned, all_opportunities } = response;

    let status = match trade {
        Some(trade) if status == "success" => BatchStatus::Executed {
            symbol: trade.symbol,
            direction: trade.direction,
            total_scanned,
        },
        _ => BatchStatus::Filtered {
            reason: message.unwrap_or_else(|| format!("No trade executed ({status})")),
        },
    };

    RankedBatch { status, opportunities: RankedOpportunities::from_batch(all_opportunities) }
}
