//! Route handlers for the purchase service.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::CornstandError;
use crate::purchase::{PurchaseOutcome, PurchaseService};

const PURCHASED_MESSAGE: &str = "Corn purchased successfully 🌽";
const RATE_LIMITED_MESSAGE: &str = "Too Many Requests 🌽";
const BUY_CLIENT_ID_REQUIRED: &str = "clientId is required to buy corn";
const STATUS_CLIENT_ID_REQUIRED: &str = "clientId is required";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const ROOT_MESSAGE: &str = "Bob's Corn rate limiter is steady as she goes";

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    service: Arc<PurchaseService>,
}

/// Build the router for all purchase routes.
pub fn router(service: Arc<PurchaseService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/buy-corn", post(buy_corn))
        .route("/status/{client_id}", get(status))
        .route("/health", get(health))
        .with_state(AppState { service })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest {
    // Non-string ids fail to deserialize and are treated as missing
    #[serde(default)]
    client_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseResponse {
    message: &'static str,
    total_purchases: u64,
    retry_after_seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedResponse {
    message: &'static str,
    retry_after_seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    client_id: String,
    can_purchase: bool,
    retry_after_seconds: u64,
    total_purchases: u64,
}

/// Error responses. Store details stay in the logs.
#[derive(Debug)]
enum ApiError {
    Validation(&'static str),
    Internal,
}

impl ApiError {
    fn from_error(err: CornstandError, validation_message: &'static str) -> Self {
        if err.is_validation() {
            ApiError::Validation(validation_message)
        } else {
            ApiError::Internal
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": ROOT_MESSAGE }))
}

/// Attempt one purchase for the client named in the body.
#[instrument(skip(state, payload))]
async fn buy_corn(
    State(state): State<AppState>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable purchase request body");
            PurchaseRequest::default()
        }
    };
    let client_id = request.client_id.unwrap_or_default();

    let outcome = state
        .service
        .purchase(&client_id)
        .await
        .map_err(|e| ApiError::from_error(e, BUY_CLIENT_ID_REQUIRED))?;

    let response = match outcome {
        PurchaseOutcome::Purchased {
            total_purchases,
            retry_after_secs,
        } => (
            StatusCode::OK,
            Json(PurchaseResponse {
                message: PURCHASED_MESSAGE,
                total_purchases,
                retry_after_seconds: retry_after_secs,
            }),
        )
            .into_response(),
        PurchaseOutcome::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(RateLimitedResponse {
                message: RATE_LIMITED_MESSAGE,
                retry_after_seconds: retry_after_secs,
            }),
        )
            .into_response(),
    };
    Ok(response)
}

/// Report whether a client may purchase and how many purchases it has made.
#[instrument(skip(state))]
async fn status(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state
        .service
        .status(&client_id)
        .await
        .map_err(|e| ApiError::from_error(e, STATUS_CLIENT_ID_REQUIRED))?;

    Ok(Json(StatusResponse {
        client_id: status.client_id.to_string(),
        can_purchase: status.can_purchase,
        retry_after_seconds: status.retry_after_secs,
        total_purchases: status.total_purchases,
    }))
}

/// Report store liveness.
#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> Response {
    match state.service.health().await {
        Ok(reply) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "store": reply,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Store unavailable",
                })),
            )
                .into_response()
        }
    }
}
