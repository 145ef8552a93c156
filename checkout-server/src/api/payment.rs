//! Paystack webhook and payment verification
//!
//! The webhook body is taken as raw bytes: the signature covers the exact
//! payload, so it must be checked before any JSON parsing.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use shared::error::{ApiResponse, AppError};

use crate::checkout::ReconcileOutcome;
use crate::error::ApiResult;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// POST /api/v1/payments/webhook
///
/// 200 for every processed delivery (including no-ops), 400 for signature or
/// payload problems, 5xx only when the gateway should retry.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.reconciler.handle(signature, &body).await?;
    tracing::debug!(?outcome, "Webhook processed");
    Ok(StatusCode::OK)
}

/// GET /api/v1/payments/verify/{reference}
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<ReconcileOutcome> {
    let outcome = state.reconciler.verify_reference(&reference).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
