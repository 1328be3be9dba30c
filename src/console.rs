//! # console — operator commands for the interactive binary
//!
//! Parsing and rendering are pure so the binary's REPL stays a thin loop.

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use crate::engine::{Intent, LedgerState, RankedOpportunities};
use crate::models::{AutomationStatus, HistoryFilter, HistoryRecord};

pub const HELP: &str = "\
commands:
  start                 start auto-trading
  stop                  stop auto-trading
  run                   run one scan→execute cycle now
  scan [SYMBOL]         analyse one symbol (default symbol if omitted)
  select SYMBOL         focus an opportunity on the board
  close TRADE_ID        close an open trade
  reset                 reset the paper account
  trades                show open trades and account stats
  history [all|win|loss]
  status                show automation status
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Run,
    Scan(Option<String>),
    Select(String),
    Close(String),
    Reset,
    Trades,
    History(HistoryFilter),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument: {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("invalid history filter '{0}' (all | win | loss)")]
    BadFilter(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let arg = words.next();

        match head.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "run" => Ok(Command::Run),
            "scan" => Ok(Command::Scan(arg.map(str::to_uppercase))),
            "select" => arg
                .map(|s| Command::Select(s.to_uppercase()))
                .ok_or(CommandError::MissingArgument("select", "SYMBOL")),
            "close" => arg
                .map(|id| Command::Close(id.to_string()))
                .ok_or(CommandError::MissingArgument("close", "TRADE_ID")),
            "reset" => Ok(Command::Reset),
            "trades" => Ok(Command::Trades),
            "history" => match arg {
                None => Ok(Command::History(HistoryFilter::All)),
                Some(raw) => raw
                    .parse()
                    .map(Command::History)
                    .map_err(|_| CommandError::BadFilter(raw.to_string())),
            },
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

// ─── Rendering ────────────────────────────────────────────────────────────────

pub fn render_status(status: Option<&AutomationStatus>, intent: Intent) -> String {
    let Some(status) = status else {
        return format!("engine status unknown (local intent: {intent:?})");
    };
    let last = status
        .last_trade_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "engine: {} · trades: {} · last trade: {} · scan every {}s · local intent: {:?}",
        if status.is_running { "RUNNING" } else { "STOPPED" },
        status.trade_count,
        last,
        status.scan_interval_seconds,
        intent,
    )
}

pub fn render_ledger(state: &LedgerState) -> String {
    let stats = &state.stats;
    let mut out = format!(
        "balance ${:.2} · realized {:+.2} · floating {:+.2} · win rate {:.1}% · trades {} · exposure ${:.2}",
        stats.balance,
        stats.total_pnl,
        stats.total_floating_pnl,
        stats.win_rate,
        stats.total_trades,
        state.open_exposure(),
    );
    if state.active_trades.is_empty() {
        out.push_str("\n  no open trades");
    }
    for trade in &state.active_trades {
        let m = trade.metrics();
        let _ = write!(
            out,
            "\n  {:<10} {:<7} {:<4} entry {:.5} now {:.5} SL {:.5} TP {:.5} · P&L {:+.2} · progress {:+.0}%",
            trade.trade_id,
            trade.symbol,
            trade.direction,
            trade.entry_price,
            trade.current_price,
            trade.stop_loss,
            trade.target_price,
            trade.floating_pnl,
            m.progress_pct,
        );
    }
    out
}

pub fn render_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "  no trades".to_string();
    }
    records
        .iter()
        .map(|r| {
            format!(
                "  {:<10} {:<7} {:<4} {:<13} P&L {:+.2}",
                r.trade_id, r.symbol, r.direction, r.status, r.pnl
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_board(board: &RankedOpportunities) -> String {
    if board.is_empty() {
        return "  no opportunities".to_string();
    }
    let focused = board.selected().map(|o| o.symbol.as_str());
    board
        .items()
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let marker = if Some(o.symbol.as_str()) == focused { '▶' } else { ' ' };
            format!(
                "{marker} {:>2}. {:<7} score {:>5.1} · {:?} · confidence {:.0}%",
                i + 1,
                o.symbol,
                o.score,
                o.prediction,
                o.confidence * 100.0,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
