//! Wire and domain models of the remote trading engine.

pub mod ledger;
pub mod opportunity;
pub mod status;

pub use ledger::{
    AccountStats, ActiveTrade, Direction, HistoryFilter, HistoryRecord, LedgerResponse,
    TradeMetrics, TradeStatus,
};
pub use opportunity::{
    BotRunResponse, Candle, Opportunity, Prediction, ScanOutcome, ScanRequest, TradeLevels,
};
pub use status::{AutomationStatus, CommandAck, StartResponse, StopResponse};
