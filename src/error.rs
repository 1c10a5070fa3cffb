//! Unified client error model and status classification helpers.
//! Every asynchronous path in the core resolves to a value or one of these variants;
//! session and gate decisions never surface as errors.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientError {
    /// Credential missing or expired. Raised on a live session it forces logout.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    /// Authenticated but the role is insufficient. Never logs the user out.
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("not_found: {message}")]
    NotFound { message: String },
    /// Network failure or any other non-2xx. Retryable by user action only.
    #[error("fetch_failed{}: {message}", status_suffix(.status))]
    FetchFailed { status: Option<u16>, message: String },
    /// Unparseable local session data. Self-healed by clearing, never blocking.
    #[error("malformed_local_state: {message}")]
    MalformedLocalState { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Uniform message for a rejected login, regardless of backend wording.
pub const INVALID_LOGIN_MESSAGE: &str = "invalid username or password";

impl ClientError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Unauthorized { .. } => "unauthorized",
            ClientError::Forbidden { .. } => "forbidden",
            ClientError::NotFound { .. } => "not_found",
            ClientError::FetchFailed { .. } => "fetch_failed",
            ClientError::MalformedLocalState { .. } => "malformed_local_state",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClientError::Unauthorized { message }
            | ClientError::Forbidden { message }
            | ClientError::NotFound { message }
            | ClientError::FetchFailed { message, .. }
            | ClientError::MalformedLocalState { message } => message.as_str(),
        }
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { ClientError::Unauthorized { message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { ClientError::Forbidden { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { ClientError::NotFound { message: msg.into() } }
    pub fn fetch_failed<S: Into<String>>(status: Option<u16>, msg: S) -> Self { ClientError::FetchFailed { status, message: msg.into() } }
    pub fn malformed<S: Into<String>>(msg: S) -> Self { ClientError::MalformedLocalState { message: msg.into() } }

    /// Classify a non-success HTTP status.
    pub fn from_status<S: Into<String>>(status: u16, msg: S) -> Self {
        match status {
            401 => ClientError::unauthorized(msg),
            403 => ClientError::forbidden(msg),
            404 => ClientError::not_found(msg),
            _ => ClientError::fetch_failed(Some(status), msg),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::FetchFailed { status, .. } => *status,
            ClientError::MalformedLocalState { .. } => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool { matches!(self, ClientError::Unauthorized { .. }) }

    /// Whether a user-initiated retry can reasonably succeed.
    pub fn is_retryable(&self) -> bool { matches!(self, ClientError::FetchFailed { .. }) }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        match status {
            Some(code) => ClientError::from_status(code, err.to_string()),
            None => ClientError::fetch_failed(None, err.to_string()),
        }
    }
}
