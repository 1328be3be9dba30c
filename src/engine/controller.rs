//! # engine::controller
//!
//! **Auto-Trade Controller** — local automation intent over the engine's
//! authoritative running flag.
//!
//! ```text
//!            start() ─ started | already_running ─▶ ┌─────────┐
//!  ┌─────────┐                                      │ Running │──▶ cycle timer (every 60s)
//!  │ Stopped │ ◀──────────── stop() ─ stopped ───── └─────────┘       │
//!  └─────────┘                                                       ▼
//!                                          POST /run_bot → rank → publish board → refresh ledger
//! ```
//!
//! * The controller owns exactly one cycle timer, created on the transition
//!   to `Running` and aborted on the transition to `Stopped`.
//! * Each tick spawns the cycle as its own task, so aborting the timer never
//!   cuts a request short.  A cycle whose generation is stale when its
//!   response lands is discarded without touching any state.
//! * At most one cycle request is outstanding at any time.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::TradingApi;
use crate::config::Config;
use crate::engine::ledger::TradeLedgerView;
use crate::engine::periodic::PeriodicTask;
use crate::engine::ranker::{rank_cycle, BatchStatus, RankedBatch, RankedOpportunities};
use crate::engine::single_flight::{Flight, Overlap, SingleFlight};
use crate::error::ClientError;
use crate::events::{Notification, NotificationSink};
use crate::models::ScanOutcome;

/// Client-local automation intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    Stopped,
    Running,
}

#[derive(Default)]
struct ControllerState {
    intent:      Intent,
    /// Bumped on every `Stopped → Running` and `Running → Stopped` edge.
    generation:  u64,
    cycle_timer: Option<PeriodicTask>,
}

pub struct AutoTradeController {
    api:    Arc<dyn TradingApi>,
    ledger: Arc<TradeLedgerView>,
    sink:   NotificationSink,
    config: Config,
    state:  Mutex<ControllerState>,
    board:  watch::Sender<RankedOpportunities>,
    flight: SingleFlight,
}

impl AutoTradeController {
    pub fn new(
        api: Arc<dyn TradingApi>,
        ledger: Arc<TradeLedgerView>,
        sink: NotificationSink,
        config: Config,
    ) -> Arc<Self> {
        let (board, _) = watch::channel(RankedOpportunities::default());
        Arc::new(Self {
            api,
            ledger,
            sink,
            config,
            state: Mutex::new(ControllerState::default()),
            board,
            flight: SingleFlight::new(),
        })
    }

    pub fn intent(&self) -> Intent {
        self.state.lock().intent
    }

    /// Current opportunity board.
    pub fn opportunities(&self) -> RankedOpportunities {
        self.board.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RankedOpportunities> {
        self.board.subscribe()
    }

    /// Focus another symbol on the board.  No network traffic.
    pub fn select(&self, symbol: &str) -> bool {
        let mut found = false;
        self.board.send_if_modified(|board| {
            found = board.select(symbol);
            found
        });
        found
    }

    // ─── Start / Stop ─────────────────────────────────────────────────────────

    /// Idempotent: `started` and `already_running` both mean `Running`, and a
    /// second start never schedules a second cycle timer.
    pub async fn start(self: &Arc<Self>) -> Result<(), ClientError> {
        let response = match self.api.start_automation().await {
            Ok(response) if response.is_accepted() => response,
            Ok(response) => {
                let err = ClientError::rejected("start", response.status, response.message);
                warn!(error = %err, "start rejected — intent unchanged");
                self.sink.report_error("start", &err);
                return Err(err);
            }
            Err(e) => {
                warn!(error = %e, "start failed — intent unchanged");
                self.sink.report_error("start", &e);
                return Err(e);
            }
        };

        {
            let mut state = self.state.lock();
            if state.intent == Intent::Stopped {
                state.intent = Intent::Running;
                state.generation += 1;
            }
            if state.cycle_timer.is_none() {
                state.cycle_timer = Some(self.spawn_cycle_timer(state.generation));
            }
        }

        info!(
            already_running = response.was_already_running(),
            period          = ?self.config.cycle_interval,
            "🚀 auto-trading running"
        );
        self.sink.notify(Notification::AutomationStarted {
            already_running: response.was_already_running(),
        });
        Ok(())
    }

    /// Returns the engine's total trade count.  Intent becomes `Stopped` only
    /// on an explicit `stopped` answer.
    pub async fn stop(&self) -> Result<u32, ClientError> {
        let response = match self.api.stop_automation().await {
            Ok(response) if response.is_stopped() => response,
            Ok(response) => {
                let err = ClientError::rejected("stop", response.status, response.message);
                warn!(error = %err, "stop rejected — intent unchanged");
                self.sink.report_error("stop", &err);
                return Err(err);
            }
            Err(e) => {
                warn!(error = %e, "stop failed — intent unchanged");
                self.sink.report_error("stop", &e);
                return Err(e);
            }
        };

        self.halt();

        let total_trades = match response.total_trades {
            Some(total) => total,
            None => {
                warn!(message = ?response.message, "engine confirmed stop without total_trades — reporting 0");
                0
            }
        };
        info!(total_trades, "🛑 auto-trading stopped");
        self.sink.notify(Notification::AutomationStopped { total_trades });
        Ok(total_trades)
    }

    /// Drops local intent and the cycle timer without telling the engine.
    /// Used on teardown.
    pub fn halt(&self) {
        let timer = {
            let mut state = self.state.lock();
            if state.intent == Intent::Running {
                state.intent = Intent::Stopped;
                state.generation += 1;
            }
            state.cycle_timer.take()
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
    }

    // ─── Automation Cycle ─────────────────────────────────────────────────────

    fn spawn_cycle_timer(self: &Arc<Self>, generation: u64) -> PeriodicTask {
        let weak: Weak<Self> = Arc::downgrade(self);
        PeriodicTask::spawn("auto-cycle", self.config.cycle_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(this) = weak.upgrade() {
                    tokio::spawn(async move {
                        this.run_cycle(generation).await;
                    });
                }
            }
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.intent == Intent::Running && state.generation == generation
    }

    /// One timed cycle.  Skipped while another cycle is outstanding.
    async fn run_cycle(&self, generation: u64) -> Flight {
        let flight = self.flight.run(Overlap::Skip, || self.cycle(generation)).await;
        if flight == Flight::Skipped {
            debug!("previous cycle still outstanding — tick skipped");
        }
        flight
    }

    async fn cycle(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        let cycle_id = Uuid::new_v4();
        debug!(%cycle_id, "🤖 automation cycle");

        let result = self.api.run_bot().await;

        if !self.is_current(generation) {
            info!(%cycle_id, "automation stopped mid-cycle — result discarded");
            self.sink.notify(Notification::CycleDiscarded { cycle_id: cycle_id.to_string() });
            return;
        }

        match result {
            Ok(response) => self.apply(rank_cycle(response)).await,
            Err(e) => {
                warn!(%cycle_id, error = %e, "automation cycle failed");
                self.sink.report_error("run_bot", &e);
            }
        }
    }

    /// Publish a ranked batch and bring the ledger up to date.
    async fn apply(&self, batch: RankedBatch) {
        let RankedBatch { status, opportunities } = batch;
        self.board.send_replace(opportunities);

        match status {
            BatchStatus::Executed { symbol, direction, total_scanned } => {
                info!(%symbol, %direction, total_scanned, "💹 trade executed");
                self.sink.notify(Notification::TradeExecuted { symbol, direction, total_scanned });
            }
            BatchStatus::Filtered { reason } => {
                info!(%reason, "cycle produced no trade");
                self.sink.notify(Notification::CycleFiltered { reason });
            }
        }

        self.ledger.refresh().await;
    }

    // ─── One-shot Operations ──────────────────────────────────────────────────

    /// A single scan→select→execute pass, independent of the intent.
    pub async fn run_once(&self) -> Result<BatchStatus, ClientError> {
        match self.api.run_bot().await {
            Ok(response) => {
                let batch = rank_cycle(response);
                let status = batch.status.clone();
                self.apply(batch).await;
                Ok(status)
            }
            Err(e) => {
                self.sink.report_error("run_bot", &e);
                Err(e)
            }
        }
    }

    /// Analyse one symbol.  A filtered answer leaves the board and the ledger
    /// untouched and surfaces the engine's reason verbatim.
    pub async fn scan(&self, symbol: &str) -> Result<ScanOutcome, ClientError> {
        let request = self.config.scan_request(symbol);
        let outcome = match self.api.scan(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.sink.report_error("scan", &e);
                return Err(e);
            }
        };

        match &outcome {
            ScanOutcome::Success(opportunity) => {
                info!(symbol = %opportunity.symbol, score = opportunity.score, "🔍 scan complete");
                self.board.send_replace(RankedOpportunities::from_batch(vec![(**opportunity).clone()]));
                self.sink.notify(Notification::ScanCompleted {
                    symbol: opportunity.symbol.clone(),
                    score:  opportunity.score,
                });
            }
            ScanOutcome::Filtered { symbol, reason } => {
                info!(%symbol, %reason, "scan filtered");
                self.sink.notify(Notification::ScanFiltered { symbol: symbol.clone(), reason: reason.clone() });
            }
        }
        Ok(outcome)
    }

    /// Reset the account: confirmation, ledger refresh, then a fresh scan of
    /// the default symbol.  Returns the engine's confirmation message.
    pub async fn reset_account(&self) -> Result<String, ClientError> {
        let message = self.ledger.reset().await?;
        if let Err(e) = self.scan(&self.config.default_symbol).await {
            debug!(error = %e, "post-reset scan failed");
        }
        Ok(message)
    }
}
