//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, WebhookResponse};
use super::AppState;
use crate::telegram::parse_update;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Header carrying the secret registered with `setWebhook`
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    if let Some(expected) = &state.config.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("Rejected webhook with missing or wrong secret");
            return Err(AppError::Unauthorized);
        }
    }

    let inbound = parse_update(&body).map_err(|e| {
        tracing::warn!(error = %e, "Malformed update");
        AppError::BadRequest(e.to_string())
    })?;
    let Some(inbound) = inbound else {
        return Ok(Json(WebhookResponse::ignored()));
    };

    let router = state
        .router
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("bot token not configured".to_string()))?;

    match router.handle(inbound).await {
        Ok(outcome) => {
            tracing::debug!(effects = outcome.effects_applied, "Update handled");
            Ok(Json(WebhookResponse::handled(outcome.phase.name())))
        }
        Err(e) => {
            tracing::error!(error = %e, "Turn failed");
            Ok(Json(WebhookResponse::failed(e.to_string())))
        }
    }
}

// ============================================================
// Status
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        bot_token_configured: state.config.bot_token_configured(),
        database_configured: state.db.ping(),
    })
}

async fn get_version() -> &'static str {
    concat!("guild-ledger ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Errors
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized,
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid secret token".to_string()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
