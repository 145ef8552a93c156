//! Order endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{ApiResponse, AppError};
use shared::models::{CheckoutReceipt, CreateOrderRequest, Order, OrderDetail, UpdateOrderStatusRequest};
use uuid::Uuid;

use crate::auth::{Actor, Tenant};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/orders
///
/// Checkout runs on its own task so a client disconnect cannot drop the
/// transaction halfway; it always ends in commit or rollback.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutReceipt>>), AppError> {
    let coordinator = state.coordinator.clone();
    let receipt = tokio::spawn(async move {
        coordinator
            .create_order(tenant.store_id, &actor, req)
            .await
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Checkout task failed");
        AppError::internal("Checkout failed")
    })??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Order created", receipt)),
    ))
}

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Vec<OrderDetail>> {
    let orders = state.coordinator.get_orders(tenant.store_id, &actor).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = state
        .coordinator
        .get_order_by_id(tenant.store_id, &actor, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// PATCH /api/v1/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<Order> {
    let order = state
        .coordinator
        .update_status(tenant.store_id, &actor, order_id, req.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
