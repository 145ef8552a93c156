//! Cart endpoints

use axum::{Extension, Json, extract::State, http::StatusCode};
use shared::error::{ApiResponse, AppError};
use shared::models::{
    AddCartItemRequest, CartEntry, CartView, RemoveCartItemRequest, UpdateCartItemRequest,
};

use crate::auth::{Actor, Tenant};
use crate::cart::check_quantity;
use crate::error::ApiResult;
use crate::state::AppState;

async fn snapshot(state: &AppState, tenant: Tenant, actor: &Actor) -> ApiResult<CartView> {
    let items = state.carts.read(tenant.store_id, &actor.cart_owner()).await?;
    Ok(Json(ApiResponse::success(CartView { items })))
}

/// GET /api/v1/cart
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<CartView> {
    snapshot(&state, tenant, &actor).await
}

/// POST /api/v1/cart/add
pub async fn add_item(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<AddCartItemRequest>,
) -> ApiResult<CartView> {
    let entry = CartEntry {
        product_id: req.product_id,
        variant_id: req.variant_id,
        quantity: check_quantity(req.quantity)?,
    };
    state
        .carts
        .add(tenant.store_id, &actor.cart_owner(), entry)
        .await?;
    snapshot(&state, tenant, &actor).await
}

/// PATCH /api/v1/cart/item
pub async fn update_item(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UpdateCartItemRequest>,
) -> ApiResult<CartView> {
    state
        .carts
        .update_quantity(tenant.store_id, &actor.cart_owner(), req.item_key, req.quantity)
        .await?;
    snapshot(&state, tenant, &actor).await
}

/// DELETE /api/v1/cart/item
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<RemoveCartItemRequest>,
) -> ApiResult<CartView> {
    state
        .carts
        .remove(tenant.store_id, &actor.cart_owner(), req.item_key)
        .await?;
    snapshot(&state, tenant, &actor).await
}

/// DELETE /api/v1/cart
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Extension(actor): Extension<Actor>,
) -> Result<StatusCode, AppError> {
    state.carts.clear(tenant.store_id, &actor.cart_owner()).await?;
    Ok(StatusCode::NO_CONTENT)
}
