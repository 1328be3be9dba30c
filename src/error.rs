//! # error
//!
//! Centralised client error type.
//!
//! Every remote call returns `Result<_, ClientError>`.  Components catch these
//! at their boundary and turn them into a [`Notification`](crate::events::Notification),
//! so no failure ever escapes into a polling loop.

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The engine could not be reached (connect error, timeout, reset).
    #[error("{operation}: engine unreachable: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The engine answered with a non-2xx status.
    #[error("{operation}: HTTP {status}: {body}")]
    Http {
        operation: &'static str,
        status:    StatusCode,
        body:      String,
    },

    /// The engine answered 2xx but the body did not match the contract.
    #[error("{operation}: malformed response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A command (start/stop/close/reset) came back with an unexpected status.
    #[error("{operation}: rejected with status '{status}'{}", detail(.message))]
    CommandRejected {
        operation: &'static str,
        status:    String,
        message:   Option<String>,
    },

    /// A command argument that cannot be sent as given.  Nothing was issued.
    #[error("{operation}: {message}")]
    InvalidArgument {
        operation: &'static str,
        message:   String,
    },

    /// Startup configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// Coarse classification used when reporting a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Transport,
    Command,
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport { .. }
            | ClientError::Http { .. }
            | ClientError::Decode { .. } => ErrorKind::Transport,
            ClientError::CommandRejected { .. } | ClientError::InvalidArgument { .. } => ErrorKind::Command,
            ClientError::Config(_) => ErrorKind::Config,
        }
    }

    /// Name of the remote operation that failed, if any.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ClientError::Transport { operation, .. }
            | ClientError::Http { operation, .. }
            | ClientError::Decode { operation, .. }
            | ClientError::CommandRejected { operation, .. }
            | ClientError::InvalidArgument { operation, .. } => Some(*operation),
            ClientError::Config(_) => None,
        }
    }

    pub(crate) fn rejected(
        operation: &'static str,
        status: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        ClientError::CommandRejected { operation, status: status.into(), message }
    }
}
