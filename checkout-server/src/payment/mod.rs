//! Payment gateway boundary
//!
//! The gateway hosts the payment page and later confirms settlement through a
//! signed webhook. [`PaystackGateway`] talks to the Paystack REST API.

mod event;
mod paystack;

pub use event::{ChargeCustomer, ChargeData, GatewayEvent};
pub use paystack::{PaystackGateway, sign_payload, verify_signature};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment gateway timed out after {0:?}")]
    Timeout(Duration),

    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("amount {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),

    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

/// Metadata attached to a transaction so the webhook can find the order again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub order_id: Uuid,
    pub tenant_id: Uuid,
}

/// Hosted payment session returned by `initialize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

/// Result of looking a transaction up by reference
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub reference: String,
    /// Gateway status string (`success`, `failed`, `abandoned`, ...)
    pub status: String,
    /// Amount in minor units
    pub amount: i64,
    pub order_id: Option<Uuid>,
    pub customer_email: Option<String>,
}

impl VerifiedTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a hosted payment for `amount` (major units, sent as minor units)
    async fn initialize(
        &self,
        email: &str,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError>;

    async fn verify_transaction(&self, reference: &str)
    -> Result<VerifiedTransaction, PaymentError>;

    /// HMAC check of the webhook signature header over the exact raw body
    fn verify_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool;
}
