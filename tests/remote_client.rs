//! RemoteTradingClient against an in-process stub of the engine.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use forexpilot::error::ErrorKind;
use forexpilot::models::{Direction, Prediction, ScanOutcome, ScanRequest, TradeStatus};
use forexpilot::{ClientError, RemoteTradingClient, TradingApi};

type Hits = Arc<Mutex<Vec<String>>>;

async fn record(State(hits): State<Hits>, method: Method, uri: Uri) {
    hits.lock().push(format!("{method} {}", uri.path()));
}

fn opportunity_json(symbol: &str, confidence: f64) -> Value {
    json!({
        "symbol": symbol,
        "score": 78.4,
        "prediction": "UP",
        "confidence": confidence,
        "current_price": 1.0842,
        "indicators": { "rsi": 58.2, "macd": 0.0004 },
        "chart_data": [
            { "time": 1714557600, "open": 1.0831, "high": 1.0848, "low": 1.0827, "close": 1.0842 }
        ],
        "trade_levels": {
            "entry_price": 1.0842, "stop_loss": 1.0812, "target_price": 1.0902,
            "direction": "BUY", "risk_reward": 2.0, "atr": 0.0015
        },
        "future_path": null,
        "patterns": { "hammer": true }
    })
}

fn app(hits: Hits) -> Router {
    Router::new()
        .route(
            "/api/auto-trade/status",
            get(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                Json(json!({
                    "is_running": true,
                    "last_trade_time": "2024-05-01T10:15:00.123456",
                    "trade_count": 3,
                    "scan_interval": 300
                }))
            }),
        )
        .route(
            "/api/auto-trade/start",
            post(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                Json(json!({ "status": "already_running", "message": "Auto-trading is already running" }))
            }),
        )
        .route(
            "/api/auto-trade/stop",
            post(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                Json(json!({ "status": "stopped", "message": "Auto-trading stopped", "total_trades": 5 }))
            }),
        )
        .route(
            "/api/scan",
            post(|state: State<Hits>, m: Method, u: Uri, Json(request): Json<ScanRequest>| async move {
                record(state, m, u).await;
                if request.symbol == "EURUSD" {
                    let mut body = opportunity_json("EURUSD", 0.42);
                    body["status"] = json!("filtered");
                    body["message"] = json!("confidence 0.42 below 0.65 threshold");
                    Json(body)
                } else {
                    Json(opportunity_json(&request.symbol, 0.81))
                }
            }),
        )
        .route(
            "/api/run_bot",
            post(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                Json(json!({
                    "status": "success",
                    "trade": {
                        "trade_id": "A1B2C3D4", "symbol": "GBPUSD", "direction": "SELL",
                        "entry_price": 1.2650, "stop_loss": 1.2690, "target_price": 1.2570,
                        "lot_size": 0.4, "score": 81.0, "status": "OPEN",
                        "entry_time": "2024-05-01T10:15:00"
                    },
                    "total_scanned": 2,
                    "all_opportunities": [opportunity_json("GBPUSD", 85.0), opportunity_json("USDJPY", 71.0)]
                }))
            }),
        )
        .route(
            "/api/trades",
            get(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                Json(json!({
                    "active_trades": [{
                        "trade_id": "T1", "symbol": "EURUSD", "direction": "BUY",
                        "entry_price": 1.08, "current_price": 1.0825, "stop_loss": 1.075,
                        "target_price": 1.09, "lot_size": 0.5, "score": 72.0,
                        "floating_pnl": 125.0, "pnl_percentage": 0.23,
                        "risk_amount": 250.0, "risk_percentage": 2.5
                    }],
                    "recent_history": [{
                        "trade_id": "T0", "symbol": "USDJPY", "direction": "SELL",
                        "entry_price": 155.2, "exit_price": 154.8, "stop_loss": 155.6,
                        "target_price": 154.4, "lot_size": 0.3, "score": 69.0, "pnl": 77.5,
                        "status": "CLOSED_MANUAL",
                        "entry_time": "2024-05-01T09:00:00", "exit_time": "2024-05-01T09:45:12.5"
                    }],
                    "stats": {
                        "balance": 10077.5, "total_pnl": 77.5, "total_floating_pnl": 125.0,
                        "max_risk_per_trade": 250.0, "total_daily_risk": 250.0,
                        "win_rate": 100.0, "total_trades": 1
                    }
                }))
            }),
        )
        .route(
            "/api/close_trade/:trade_id",
            post(|state: State<Hits>, m: Method, u: Uri, Path(trade_id): Path<String>| async move {
                record(state, m, u).await;
                Json(json!({ "status": "success", "message": "Trade closed", "trade_id": trade_id }))
            }),
        )
        .route(
            "/api/reset",
            post(|state: State<Hits>, m: Method, u: Uri| async move {
                record(state, m, u).await;
                (StatusCode::INTERNAL_SERVER_ERROR, "database locked").into_response()
            }),
        )
        .with_state(hits)
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn stub() -> (RemoteTradingClient, Hits) {
    let hits: Hits = Arc::default();
    let base = serve(app(Arc::clone(&hits))).await;
    (RemoteTradingClient::new(base, Duration::from_secs(5)), hits)
}

#[tokio::test]
async fn test_automation_endpoints() {
    let (client, hits) = stub().await;

    let status = client.automation_status().await.unwrap();
    assert!(status.is_running);
    assert_eq!(status.trade_count, 3);
    assert_eq!(status.scan_interval_seconds, 300);
    assert!(status.last_trade_time.is_some());

    let start = client.start_automation().await.unwrap();
    assert!(start.is_accepted());
    assert!(start.was_already_running());

    let stop = client.stop_automation().await.unwrap();
    assert!(stop.is_stopped());
    assert_eq!(stop.total_trades, Some(5));

    assert_eq!(
        *hits.lock(),
        ["GET /api/auto-trade/status", "POST /api/auto-trade/start", "POST /api/auto-trade/stop"]
    );
}

#[tokio::test]
async fn test_scan_success_and_filtered() {
    let (client, _) = stub().await;

    match client.scan(&ScanRequest::new("GBPUSD", "1mo", "15m")).await.unwrap() {
        ScanOutcome::Success(opportunity) => {
            assert_eq!(opportunity.symbol, "GBPUSD");
            assert_eq!(opportunity.prediction, Prediction::Up);
            assert_eq!(opportunity.chart_series.len(), 1);
            assert_eq!(opportunity.trade_levels.direction, Some(Direction::Buy));
            assert!(opportunity.trade_levels.is_ordered());
        }
        other => panic!("expected success, got {other:?}"),
    }

    let filtered = client.scan(&ScanRequest::new("EURUSD", "1mo", "15m")).await.unwrap();
    assert_eq!(
        filtered,
        ScanOutcome::Filtered {
            symbol: "EURUSD".into(),
            reason: "confidence 0.42 below 0.65 threshold".into(),
        }
    );
}

#[tokio::test]
async fn test_run_bot_decodes_trade_and_batch() {
    let (client, _) = stub().await;

    let run = client.run_bot().await.unwrap();
    assert_eq!(run.status, "success");
    assert_eq!(run.total_scanned, 2);
    let trade = run.trade.unwrap();
    assert_eq!(trade.direction, Direction::Sell);
    assert_eq!(trade.status, TradeStatus::Open);
    let symbols: Vec<_> = run.all_opportunities.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(symbols, ["GBPUSD", "USDJPY"]);
}

#[tokio::test]
async fn test_ledger_and_close() {
    let (client, hits) = stub().await;

    let ledger = client.ledger().await.unwrap();
    assert_eq!(ledger.active_trades[0].trade_id, "T1");
    assert_eq!(ledger.recent_history[0].status, TradeStatus::ClosedManual);
    assert!(ledger.recent_history[0].exit_time.is_some());
    assert_eq!(ledger.stats.total_trades, 1);
    assert_eq!(ledger.stats.initial_balance, None);

    let ack = client.close_trade("T1").await.unwrap();
    assert!(ack.is_success());
    assert_eq!(ack.trade_id.as_deref(), Some("T1"));
    assert_eq!(hits.lock().last().map(String::as_str), Some("POST /api/close_trade/T1"));
}

#[tokio::test]
async fn test_close_trade_id_cannot_reach_other_endpoints() {
    let (client, hits) = stub().await;

    let ack = client.close_trade("../reset").await.unwrap();
    assert_eq!(ack.trade_id.as_deref(), Some("../reset"));
    assert_eq!(*hits.lock(), ["POST /api/close_trade/..%2Freset"]);

    let err = client.close_trade("..").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument { operation: "close_trade", .. }));
    assert_eq!(hits.lock().len(), 1);
}

#[tokio::test]
async fn test_http_error_is_transport_failure() {
    let (client, _) = stub().await;

    let err = client.reset_account().await.unwrap_err();
    match &err {
        ClientError::Http { operation, status, body } => {
            assert_eq!(*operation, "reset");
            assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "database locked");
        }
        other => panic!("expected Http, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route("/api/trades", get(|| async { "<html>not json</html>" }));
    let client = RemoteTradingClient::new(serve(router).await, Duration::from_secs(5));

    let err = client.ledger().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { operation: "trades", .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_unreachable_engine() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RemoteTradingClient::new(format!("http://{addr}/api"), Duration::from_secs(2));
    let err = client.automation_status().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { operation: "status", .. }));
    assert_eq!(err.operation(), Some("status"));
}
