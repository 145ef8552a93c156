//! Order confirmation notifications
//!
//! Settlement only enqueues a job; delivery happens on a background worker so
//! that a slow or failing mail server never holds up webhook acknowledgement.

mod mailer;
mod queue;

pub use mailer::{LogMailer, SmtpMailer};
pub use queue::NotificationQueue;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("notification queue full")]
    QueueFull,

    #[error("notification queue closed")]
    QueueClosed,
}

/// Payload of a "your order is paid" message
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub recipient: String,
    pub total_amount: Decimal,
    pub reference: Option<String>,
}

impl OrderConfirmation {
    pub fn subject(&self) -> String {
        format!("Order {} confirmed", self.order_id)
    }

    pub fn body_text(&self) -> String {
        let mut body = format!(
            "Thank you for your order.\n\nOrder: {}\nTotal paid: {}\n",
            self.order_id, self.total_amount
        );
        if let Some(reference) = &self.reference {
            body.push_str(&format!("Payment reference: {reference}\n"));
        }
        body
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), NotifyError>;
}
