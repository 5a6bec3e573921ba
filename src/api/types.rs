//! API response types

use serde::Serialize;

/// Reply to the chat platform for every accepted update
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    /// `false` for update kinds the bot does not react to
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    pub fn ignored() -> Self {
        Self {
            ok: true,
            handled: false,
            phase: None,
            error: None,
        }
    }

    pub fn handled(phase: &'static str) -> Self {
        Self {
            ok: true,
            handled: true,
            phase: Some(phase),
            error: None,
        }
    }

    /// The turn ran and failed part way. Still a 2xx so the platform does
    /// not redeliver an update whose ledger write may already have landed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            handled: true,
            phase: None,
            error: Some(error.into()),
        }
    }
}

/// Liveness report
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub bot_token_configured: bool,
    pub database_configured: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: message.into(),
        }
    }
}
