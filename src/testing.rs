//! Scripted in-memory [`TradingApi`] for component tests.
//!
//! Each operation pops its next scripted response (or repeats a fallback),
//! counts calls, tracks how many are outstanding, and can be *held* so a test
//! decides exactly when a response arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::client::TradingApi;
use crate::error::ClientError;
use crate::models::*;

pub(crate) struct Script<T> {
    queue:    Mutex<VecDeque<Result<T, ClientError>>>,
    fallback: Mutex<Option<T>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()), fallback: Mutex::new(None) }
    }

    pub(crate) fn push(&self, response: Result<T, ClientError>) {
        self.queue.lock().push_back(response);
    }

    /// Answer used once the queue is empty.
    pub(crate) fn always(&self, value: T) {
        *self.fallback.lock() = Some(value);
    }

    fn next(&self, op: &str) -> Result<T, ClientError> {
        if let Some(response) = self.queue.lock().pop_front() {
            return response;
        }
        self.fallback
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Config(format!("no scripted response for {op}")))
    }
}

#[derive(Default)]
struct Counters {
    calls:       HashMap<&'static str, usize>,
    outstanding: HashMap<&'static str, usize>,
    peak:        HashMap<&'static str, usize>,
}

pub(crate) struct FakeApi {
    pub status: Script<AutomationStatus>,
    pub start:  Script<StartResponse>,
    pub stop:   Script<StopResponse>,
    pub scan:   Script<ScanOutcome>,
    pub run:    Script<BotRunResponse>,
    pub ledger: Script<LedgerResponse>,
    pub close:  Script<CommandAck>,
    pub reset:  Script<CommandAck>,
    counters:   Mutex<Counters>,
    gates:      Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            status:   Script::new(),
            start:    Script::new(),
            stop:     Script::new(),
            scan:     Script::new(),
            run:      Script::new(),
            ledger:   Script::new(),
            close:    Script::new(),
            reset:    Script::new(),
            counters: Mutex::new(Counters::default()),
            gates:    Mutex::new(HashMap::new()),
        })
    }

    /// Responses for `op` wait until [`FakeApi::release`] is called.
    pub(crate) fn hold(&self, op: &'static str) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release(&self, op: &'static str) {
        if let Some(gate) = self.gates.lock().get(op) {
            gate.add_permits(1);
        }
    }

    pub(crate) fn calls(&self, op: &'static str) -> usize {
        self.counters.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn outstanding(&self, op: &'static str) -> usize {
        self.counters.lock().outstanding.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn peak(&self, op: &'static str) -> usize {
        self.counters.lock().peak.get(op).copied().unwrap_or(0)
    }

    /// Yield until `op` has been called at least `n` times.
    pub(crate) async fn wait_for_calls(&self, op: &'static str, n: usize) {
        for _ in 0..1_000 {
            if self.calls(op) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{op} was called {} times, expected {n}", self.calls(op));
    }

    async fn call<T: Clone>(&self, op: &'static str, script: &Script<T>) -> Result<T, ClientError> {
        {
            let mut c = self.counters.lock();
            *c.calls.entry(op).or_default() += 1;
            let now = {
                let out = c.outstanding.entry(op).or_default();
                *out += 1;
                *out
            };
            let peak = c.peak.entry(op).or_default();
            *peak = (*peak).max(now);
        }
        let _done = Outstanding { api: self, op };

        let gate = self.gates.lock().get(op).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        script.next(op)
    }
}

struct Outstanding<'a> {
    api: &'a FakeApi,
    op:  &'static str,
}

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        if let Some(out) = self.api.counters.lock().outstanding.get_mut(self.op) {
            *out -= 1;
        }
    }
}

#[async_trait]
impl TradingApi for FakeApi {
    async fn automation_status(&self) -> Result<AutomationStatus, ClientError> {
        self.call("status", &self.status).await
    }
    async fn start_automation(&self) -> Result<StartResponse, ClientError> {
        self.call("start", &self.start).await
    }
    async fn stop_automation(&self) -> Result<StopResponse, ClientError> {
        self.call("stop", &self.stop).await
    }
    async fn scan(&self, _request: &ScanRequest) -> Result<ScanOutcome, ClientError> {
        self.call("scan", &self.scan).await
    }
    async fn run_bot(&self) -> Result<BotRunResponse, ClientError> {
        self.call("run_bot", &self.run).await
    }
    async fn ledger(&self) -> Result<LedgerResponse, ClientError> {
        self.call("trades", &self.ledger).await
    }
    async fn close_trade(&self, _trade_id: &str) -> Result<CommandAck, ClientError> {
        self.call("close_trade", &self.close).await
    }
    async fn reset_account(&self) -> Result<CommandAck, ClientError> {
        self.call("reset", &self.reset).await
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub(crate) fn transport_error(operation: &'static str) -> ClientError {
    ClientError::Http {
        operation,
        status: reqwest::StatusCode::BAD_GATEWAY,
        body:   "engine down".into(),
    }
}

pub(crate) fn status(is_running: bool, trade_count: u32) -> AutomationStatus {
    AutomationStatus {
        is_running,
        last_trade_time: None,
        trade_count,
        scan_interval_seconds: 300,
    }
}

pub(crate) fn active_trade(id: &str, symbol: &str) -> ActiveTrade {
    ActiveTrade {
        trade_id:        id.into(),
        symbol:          symbol.into(),
        direction:       Direction::Buy,
        entry_price:     1.0800,
        current_price:   1.0825,
        stop_loss:       1.0750,
        target_price:    1.0900,
        lot_size:        0.5,
        score:           72.0,
        floating_pnl:    125.0,
        pnl_percentage:  0.23,
        risk_amount:     250.0,
        risk_percentage: 2.5,
    }
}

pub(crate) fn closed(id: &str, symbol: &str, pnl: f64) -> HistoryRecord {
    HistoryRecord {
        trade_id:     id.into(),
        symbol:       symbol.into(),
        direction:    Direction::Buy,
        entry_price:  1.0800,
        exit_price:   Some(1.0850),
        stop_loss:    1.0750,
        target_price: Some(1.0900),
        lot_size:     0.5,
        score:        72.0,
        pnl,
        status:       if pnl > 0.0 { TradeStatus::ClosedWin } else { TradeStatus::ClosedLoss },
        entry_time:   NaiveDateTime::default(),
        exit_time:    Some(NaiveDateTime::default()),
    }
}

pub(crate) fn ledger(active: Vec<ActiveTrade>, history: Vec<HistoryRecord>, balance: f64) -> LedgerResponse {
    LedgerResponse {
        stats: AccountStats {
            balance,
            total_trades: history.len() as u32,
            ..AccountStats::default()
        },
        active_trades:  active,
        recent_history: history,
    }
}

pub(crate) fn opportunity(symbol: &str, score: f64, confidence: f64) -> Opportunity {
    Opportunity {
        symbol:        symbol.into(),
        score,
        prediction:    Prediction::Up,
        confidence,
        current_price: 1.2650,
        indicators:    Default::default(),
        chart_series:  Vec::new(),
        trade_levels:  TradeLevels {
            entry_price:  1.2650,
            stop_loss:    1.2610,
            target_price: 1.2730,
            direction:    Some(Direction::Buy),
            risk_reward:  Some(2.0),
            atr:          Some(0.0020),
        },
        future_path:   None,
        patterns:      Default::default(),
    }
}

pub(crate) fn executed_run(symbol: &str, batch: Vec<Opportunity>) -> BotRunResponse {
    let mut trade = closed("T-new", symbol, 0.0);
    trade.status     = TradeStatus::Open;
    trade.exit_price = None;
    trade.exit_time  = None;
    BotRunResponse {
        status:            "success".into(),
        message:           None,
        trade:             Some(trade),
        total_scanned:     batch.len() as u32,
        all_opportunities: batch,
    }
}

pub(crate) fn ack(status: &str, message: Option<&str>) -> CommandAck {
    CommandAck { status: status.into(), message: message.map(str::to_string), trade_id: None }
}
