//! # engine::ledger
//!
//! **Trade Ledger View** — one subscribable ledger poll for every consumer.
//!
//! ```text
//!              ┌──────────── GET /trades (every 5s, single-flight) ───────────┐
//!  engine ───▶ │ LedgerState { active_trades, stats, history, revision }      │ ──▶ watch subscribers
//!              └──────────────────────────────────────────────────────────────┘
//!                  ▲ refresh()  ← cycle / close / reset (waits for a fetch that starts after it)
//! ```
//!
//! The published state is a read-only projection rebuilt wholesale from each
//! successful fetch.  The only local edit is the optimistic removal made by
//! [`TradeLedgerView::close_trade`], which is reverted on failure and always
//! followed by a fresh fetch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::TradingApi;
use crate::engine::periodic::PeriodicTask;
use crate::engine::single_flight::{Flight, Overlap, SingleFlight};
use crate::error::ClientError;
use crate::events::{Notification, NotificationSink};
use crate::models::{AccountStats, ActiveTrade, HistoryFilter, HistoryRecord, LedgerResponse};

// ─── LedgerState ──────────────────────────────────────────────────────────────

/// Display-ready ledger.  `revision` counts successful fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerState {
    pub active_trades: Vec<ActiveTrade>,
    pub stats:         AccountStats,
    pub history:       Vec<HistoryRecord>,
    pub revision:      u64,
    pub fetched_at:    Option<DateTime<Utc>>,
}

impl LedgerState {
    pub fn trade(&self, trade_id: &str) -> Option<&ActiveTrade> {
        self.active_trades.iter().find(|t| t.trade_id == trade_id)
    }

    /// Sum of `risk_amount` across open positions.
    pub fn open_exposure(&self) -> f64 {
        self.active_trades.iter().map(|t| t.risk_amount).sum()
    }

    /// Filtered view over the cached history.  Never touches the network.
    pub fn history(&self, filter: HistoryFilter) -> Vec<&HistoryRecord> {
        filter.apply(&self.history)
    }
}

// ─── TradeLedgerView ──────────────────────────────────────────────────────────

pub struct TradeLedgerView {
    api:    Arc<dyn TradingApi>,
    sink:   NotificationSink,
    state:  watch::Sender<LedgerState>,
    flight: SingleFlight,
}

impl TradeLedgerView {
    pub fn new(api: Arc<dyn TradingApi>, sink: NotificationSink) -> Arc<Self> {
        let (state, _) = watch::channel(LedgerState::default());
        Arc::new(Self { api, sink, state, flight: SingleFlight::new() })
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LedgerState> {
        self.state.subscribe()
    }

    /// Filtered history from the cached snapshot.
    pub fn history(&self, filter: HistoryFilter) -> Vec<HistoryRecord> {
        self.state.borrow().history(filter).into_iter().cloned().collect()
    }

    /// Periodic tick: skipped while a fetch is outstanding.
    pub async fn poll_once(&self) -> Flight {
        let flight = self.flight.run(Overlap::Skip, || self.fetch()).await;
        if flight == Flight::Skipped {
            debug!("ledger fetch still outstanding — tick skipped");
        }
        flight
    }

    /// Explicit refresh.  Returns once a fetch that started after this call
    /// has finished; if one is already outstanding, its owner fetches once
    /// more and this call waits for that pass.
    pub async fn refresh(&self) -> Flight {
        self.flight.run(Overlap::Queue, || self.fetch()).await
    }

    async fn fetch(&self) {
        match self.api.ledger().await {
            Ok(ledger) => self.apply(ledger),
            Err(e) => {
                warn!(error = %e, "ledger fetch failed — keeping cached ledger");
                self.sink.report_error("trades", &e);
            }
        }
    }

    fn apply(&self, ledger: LedgerResponse) {
        let LedgerResponse { active_trades, recent_history, stats } = ledger;
        self.state.send_modify(|state| {
            *state = LedgerState {
                active_trades,
                stats,
                history:    recent_history,
                revision:   state.revision + 1,
                fetched_at: Some(Utc::now()),
            };
        });
        let state = self.state.borrow();
        debug!(
            revision = state.revision,
            open     = state.active_trades.len(),
            balance  = state.stats.balance,
            "📒 ledger refreshed"
        );
    }

    // ─── Commands ─────────────────────────────────────────────────────────────

    /// Close a position.
    ///
    /// The trade disappears from the published state at once; if the engine
    /// refuses, it is put back (unless a newer fetch already replaced the
    /// state).  Either way a refresh follows so the view converges on the
    /// engine's ledger.
    pub async fn close_trade(&self, trade_id: &str) -> Result<(), ClientError> {
        let removed = self.remove_optimistically(trade_id);

        let result = match self.api.close_trade(trade_id).await {
            Ok(ack) if ack.is_success() => {
                info!(trade_id, "✅ trade closed");
                self.sink.notify(Notification::TradeClosed { trade_id: trade_id.to_string() });
                Ok(())
            }
            Ok(ack) => Err(ClientError::rejected("close_trade", ack.status, ack.message)),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(trade_id, error = %e, "close failed — restoring trade");
            if let Some((revision, index, trade)) = removed {
                self.restore(revision, index, trade);
            }
            self.sink.report_error("close_trade", e);
        }

        self.refresh().await;
        result
    }

    fn remove_optimistically(&self, trade_id: &str) -> Option<(u64, usize, ActiveTrade)> {
        let mut removed = None;
        self.state.send_if_modified(|state| {
            let Some(index) = state.active_trades.iter().position(|t| t.trade_id == trade_id) else {
                return false;
            };
            let trade = state.active_trades.remove(index);
            removed = Some((state.revision, index, trade));
            true
        });
        removed
    }

    fn restore(&self, revision: u64, index: usize, trade: ActiveTrade) {
        self.state.send_if_modified(|state| {
            if state.revision != revision {
                return false;
            }
            let index = index.min(state.active_trades.len());
            state.active_trades.insert(index, trade);
            true
        });
    }

    /// Reset the account.
    ///
    /// The server's confirmation is surfaced verbatim *before* the refresh
    /// starts.  Returns that message.
    pub async fn reset(&self) -> Result<String, ClientError> {
        let ack = match self.api.reset_account().await {
            Ok(ack) if ack.is_success() => ack,
            Ok(ack) => {
                let err = ClientError::rejected("reset", ack.status, ack.message);
                self.sink.report_error("reset", &err);
                return Err(err);
            }
            Err(e) => {
                self.sink.report_error("reset", &e);
                return Err(e);
            }
        };

        let message = ack.message.unwrap_or_else(|| "Account reset".to_string());
        info!(message = %message, "♻️ account reset");
        self.sink.notify(Notification::AccountReset { message: message.clone() });

        self.refresh().await;
        Ok(message)
    }

    /// Start polling.  Dropping the returned handle stops it.
    pub fn spawn(self: &Arc<Self>, period: Duration) -> PeriodicTask {
        let this = Arc::clone(self);
        PeriodicTask::spawn("ledger-poll", period, move || {
            let this = Arc::clone(&this);
            async move {
                this.poll_once().await;
            }
        })
    }
}
