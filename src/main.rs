//! # ForexPilot — Operator Console
//!
//! ```text
//!  stdin ──▶ Command ──▶ AutoTradeController / TradeLedgerView ──▶ engine
//!                                     │
//!  pollers (status 5s · ledger 5s) ───┼──▶ watch replicas
//!                                     ▼
//!                        NotificationSink ──▶ log lines
//! ```
//!
//! ## Environment Variables
//!
//! | Variable               | Default                 | Description                          |
//! |------------------------|-------------------------|--------------------------------------|
//! | `TRADING_API_URL`      | `/api`                  | Engine base (relative or absolute)   |
//! | `TRADING_ORIGIN`       | `http://localhost:8000` | Origin for a relative base           |
//! | `STATUS_POLL_SECS`     | `5`                     | Status poll period                   |
//! | `LEDGER_POLL_SECS`     | `5`                     | Ledger poll period                   |
//! | `AUTO_CYCLE_SECS`      | `60`                    | Automation cycle period              |
//! | `REQUEST_TIMEOUT_SECS` | `60`                    | Per-request timeout                  |
//! | `DEFAULT_SYMBOL`       | `EURUSD`                | Symbol for `scan` and post-reset scan |
//! | `SCAN_PERIOD`          | `1mo`                   | History window sent with scans       |
//! | `SCAN_INTERVAL`        | `15m`                   | Candle interval sent with scans      |
//! | `AUTO_START`           | `false`                 | Start automation on launch           |
//! | `RUST_LOG`             | `forexpilot=debug`      | Tracing filter                       |

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forexpilot::console::{self, Command};
use forexpilot::engine::{AutoTradeController, StatusSync, TradeLedgerView};
use forexpilot::{Config, NotificationSink, RemoteTradingClient, Severity, TradingApi};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("forexpilot=debug".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   FOREXPILOT — Auto-Trade Console         ║
  ║   status · cycle · ledger                 ║
  ╚═══════════════════════════════════════════╝"#);

    let config = Config::from_env().context("Failed to load config")?;

    // One event loop, no worker threads.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        base_url = %config.base_url,
        symbol   = %config.default_symbol,
        cycle    = ?config.cycle_interval,
        "ForexPilot started"
    );

    let api: Arc<dyn TradingApi> =
        Arc::new(RemoteTradingClient::new(config.base_url.clone(), config.request_timeout));
    let sink = NotificationSink::new();

    let status     = StatusSync::new(Arc::clone(&api), sink.clone());
    let ledger     = TradeLedgerView::new(Arc::clone(&api), sink.clone());
    let controller = AutoTradeController::new(Arc::clone(&api), Arc::clone(&ledger), sink.clone(), config.clone());

    let printer = tokio::spawn(print_notifications(sink.clone()));
    let pollers = [
        status.spawn(config.status_poll_interval),
        ledger.spawn(config.ledger_poll_interval),
    ];

    if config.auto_start {
        let _ = controller.start().await;
    }

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        // Failures are already reported through the sink.
        match command {
            Command::Start => {
                let _ = controller.start().await;
            }
            Command::Stop => {
                let _ = controller.stop().await;
            }
            Command::Run => {
                if controller.run_once().await.is_ok() {
                    println!("{}", console::render_board(&controller.opportunities()));
                }
            }
            Command::Scan(symbol) => {
                let symbol = symbol.unwrap_or_else(|| config.default_symbol.clone());
                if controller.scan(&symbol).await.is_ok() {
                    println!("{}", console::render_board(&controller.opportunities()));
                }
            }
            Command::Select(symbol) => {
                if controller.select(&symbol) {
                    println!("{}", console::render_board(&controller.opportunities()));
                } else {
                    warn!(%symbol, "symbol not on the board");
                }
            }
            Command::Close(trade_id) => {
                let _ = ledger.close_trade(&trade_id).await;
            }
            Command::Reset => {
                let _ = controller.reset_account().await;
            }
            Command::Trades => println!("{}", console::render_ledger(&ledger.snapshot())),
            Command::History(filter) => {
                println!("{}", console::render_history(&ledger.history(filter)));
            }
            Command::Status => {
                println!("{}", console::render_status(status.current().as_ref(), controller.intent()));
            }
            Command::Help => println!("{}", console::HELP),
            Command::Quit => break,
        }
    }

    // ── Teardown: no timer may fire after this point ─────────────────────────
    controller.halt();
    for poller in &pollers {
        poller.cancel();
    }
    printer.abort();
    info!("👋 ForexPilot stopped");
    Ok(())
}

async fn print_notifications(sink: NotificationSink) {
    let mut events = sink.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => match event.severity() {
                Severity::Success => info!("✅ {}", event.summary()),
                Severity::Filtered => info!("🚫 {}", event.summary()),
                Severity::Info => info!("ℹ️ {}", event.summary()),
                Severity::Error => error!("❌ {}", event.summary()),
            },
            Err(RecvError::Lagged(missed)) => warn!(missed, "notification printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
