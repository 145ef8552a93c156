//! Shared types for the storefront checkout pipeline
//!
//! Error codes and the API response envelope, cart/order/address models and
//! money helpers used by the checkout server and its clients.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
