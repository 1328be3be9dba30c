//! Polling, automation control and the shared guards they run under.

pub mod controller;
pub mod ledger;
pub mod periodic;
pub mod ranker;
pub mod single_flight;
pub mod status_sync;

pub use controller::{AutoTradeController, Intent};
pub use ledger::{LedgerState, TradeLedgerView};
pub use periodic::PeriodicTask;
pub use ranker::{BatchStatus, RankedBatch, RankedOpportunities};
pub use single_flight::{Flight, Overlap, SingleFlight};
pub use status_sync::StatusSync;
