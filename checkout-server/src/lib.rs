//! checkout-server: storefront checkout pipeline
//!
//! - Per-store, per-shopper carts with a retention window ([`cart`])
//! - Stock reservation and order persistence ([`ledger`])
//! - Paystack payment initiation and webhook verification ([`payment`])
//! - Cart to order conversion and payment reconciliation ([`checkout`])
//! - Order confirmation emails with retry ([`notify`])

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod payment;
pub mod state;

pub use config::Config;
pub use state::{AppState, Background, Components};
