//! # ForexPilot — Automation Client for the Paper-Trading Engine
//!
//! ```text
//!  ┌──────────────────┐   GET  /auto-trade/status   (5s)    ┌────────────────────────┐
//!  │ StatusSync       │ ─────────────────────────────────▶ │                        │
//!  └──────────────────┘                                    │                        │
//!  ┌──────────────────┐   POST /auto-trade/{start,stop}    │   Remote trading       │
//!  │ AutoTradeCtrl    │ ─────────────────────────────────▶ │   engine  (…/api)      │
//!  │  └─ opportunity  │   POST /run_bot  (60s, Running)    │                        │
//!  │     board        │   POST /scan                       │                        │
//!  └──────────────────┘                                    │                        │
//!  ┌──────────────────┐   GET  /trades   (5s)              │                        │
//!  │ TradeLedgerView  │ ─────────────────────────────────▶ │                        │
//!  └──────────────────┘   POST /close_trade/{id}, /reset   └────────────────────────┘
//!           │
//!           └──▶ NotificationSink (broadcast) ──▶ console
//! ```
//!
//! Every piece of remote-derived state is a read-only replica published
//! through a `watch` channel.  The only writes are the explicit commands
//! (start / stop / close / reset), and each of them is followed by a fetch.

pub mod client;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{RemoteTradingClient, TradingApi};
pub use config::Config;
pub use error::ClientError;
pub use events::{Notification, NotificationSink, Severity};
