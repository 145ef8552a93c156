//! API routes for checkout-server

pub mod cart;
pub mod health;
pub mod order;
pub mod payment;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{resolve_actor, resolve_tenant};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Shopper routes: store + actor (JWT customer or guest session)
    let shopper = Router::new()
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/add", post(cart::add_item))
        .route(
            "/cart/item",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/orders", post(order::create_order).get(order::list_orders))
        .route("/orders/{id}", get(order::get_order))
        .route("/orders/{id}/status", patch(order::update_status))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_actor));

    // Store-scoped routes
    let store = Router::new()
        .merge(shopper)
        .route("/payments/verify/{reference}", get(payment::verify_payment))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_tenant));

    // Paystack webhook (signature-verified, raw body, no store header)
    let webhook = Router::new().route("/payments/webhook", post(payment::handle_webhook));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", store.merge(webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
        .with_state(state)
}
