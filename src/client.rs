//! # client — typed transport over the remote engine's HTTP surface
//!
//! One method per remote operation.  No retries, no caching: every call is a
//! single request whose failure is classified into a [`ClientError`].
//!
//! ## Endpoints (relative to the configured base)
//!
//! | Method | Path                     | Result                 |
//! |--------|--------------------------|------------------------|
//! | GET    | `/auto-trade/status`     | [`AutomationStatus`]   |
//! | POST   | `/auto-trade/start`      | [`StartResponse`]      |
//! | POST   | `/auto-trade/stop`       | [`StopResponse`]       |
//! | POST   | `/scan`                  | [`ScanOutcome`]        |
//! | POST   | `/run_bot`               | [`BotRunResponse`]     |
//! | GET    | `/trades`                | [`LedgerResponse`]     |
//! | POST   | `/close_trade/{trade_id}`| [`CommandAck`]         |
//! | POST   | `/reset`                 | [`CommandAck`]         |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::models::{
    AutomationStatus, BotRunResponse, CommandAck, LedgerResponse, ScanOutcome, ScanRequest,
    StartResponse, StopResponse,
};

// ─── TradingApi ───────────────────────────────────────────────────────────────

/// The remote engine as seen by the client components.
///
/// [`RemoteTradingClient`] is the HTTP implementation; tests plug in a
/// scripted fake.
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn automation_status(&self) -> Result<AutomationStatus, ClientError>;
    async fn start_automation(&self) -> Result<StartResponse, ClientError>;
    async fn stop_automation(&self) -> Result<StopResponse, ClientError>;
    async fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome, ClientError>;
    async fn run_bot(&self) -> Result<BotRunResponse, ClientError>;
    async fn ledger(&self) -> Result<LedgerResponse, ClientError>;
    async fn close_trade(&self, trade_id: &str) -> Result<CommandAck, ClientError>;
    async fn reset_account(&self) -> Result<CommandAck, ClientError>;
}

// ─── RemoteTradingClient ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RemoteTradingClient {
    /// reqwest Client shared by every call (connection pooling)
    http:     reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl RemoteTradingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http, base_url: base_url.into(), timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        self.http.request(method, url).timeout(self.timeout)
    }

    /// `{base}/close_trade/{trade_id}` with the id percent-encoded as a
    /// single path segment, so it can never address another endpoint.
    fn close_url(&self, trade_id: &str) -> Result<Url, ClientError> {
        if matches!(trade_id, "" | "." | "..") {
            return Err(ClientError::InvalidArgument {
                operation: "close_trade",
                message:   format!("'{trade_id}' is not a trade id"),
            });
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid engine base URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("engine base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .push("close_trade")
            .push(trade_id);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.send_raw(operation, builder).await?;
        serde_json::from_str(&body).map_err(|source| {
            warn!(operation, error = %source, "engine response did not match contract");
            ClientError::Decode { operation, source }
        })
    }

    async fn send_raw(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<String, ClientError> {
        debug!(operation, "→ engine");

        let response = builder.send().await.map_err(|source| {
            warn!(operation, error = %source, "engine unreachable");
            ClientError::Transport { operation, source }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(operation, http_status = %status, body = %body, "engine returned HTTP error");
            return Err(ClientError::Http { operation, status, body });
        }

        response
            .text()
            .await
            .map_err(|source| ClientError::Transport { operation, source })
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send_json(operation, self.request(Method::POST, path).json(body)).await
    }
}

#[async_trait]
impl TradingApi for RemoteTradingClient {
    async fn automation_status(&self) -> Result<AutomationStatus, ClientError> {
        self.send_json("status", self.request(Method::GET, "/auto-trade/status")).await
    }

    async fn start_automation(&self) -> Result<StartResponse, ClientError> {
        self.send_json("start", self.request(Method::POST, "/auto-trade/start")).await
    }

    async fn stop_automation(&self) -> Result<StopResponse, ClientError> {
        self.send_json("stop", self.request(Method::POST, "/auto-trade/stop")).await
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome, ClientError> {
        let value: serde_json::Value = self.post_json("scan", "/scan", request).await?;
        ScanOutcome::from_json(value).map_err(|source| ClientError::Decode { operation: "scan", source })
    }

    async fn run_bot(&self) -> Result<BotRunResponse, ClientError> {
        self.send_json("run_bot", self.request(Method::POST, "/run_bot")).await
    }

    async fn ledger(&self) -> Result<LedgerResponse, ClientError> {
        self.send_json("trades", self.request(Method::GET, "/trades")).await
    }

    async fn close_trade(&self, trade_id: &str) -> Result<CommandAck, ClientError> {
        let url = self.close_url(trade_id)?;
        let builder = self.http.request(Method::POST, url).timeout(self.timeout);
        self.send_json("close_trade", builder).await
    }

    async fn reset_account(&self) -> Result<CommandAck, ClientError> {
        self.send_json("reset", self.request(Method::POST, "/reset")).await
    }
}
