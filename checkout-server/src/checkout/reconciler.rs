//! Payment confirmation handling
//!
//! Confirmations arrive at least once and possibly out of order, either as a
//! signed webhook or from an explicit verify call. Both end in the ledger's
//! idempotent settlement; only a real `PENDING -> PAID` transition queues a
//! confirmation email.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::{Ledger, LedgerError, PaymentLookup, Settlement};
use crate::notify::{NotificationQueue, OrderConfirmation};
use crate::payment::{GatewayEvent, PaymentError, PaymentGateway};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gateway(#[from] PaymentError),
}

/// What a confirmation did; every variant is acknowledged to the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Settled {
        order_id: Uuid,
    },
    AlreadySettled {
        status: OrderStatus,
    },
    Underpaid {
        total: Decimal,
        paid: Decimal,
    },
    NotPayable {
        status: OrderStatus,
    },
    OrderNotFound,
    /// Gateway reports the transaction as anything but `success`
    NotSuccessful {
        gateway_status: String,
    },
    Ignored {
        event: String,
    },
}

pub struct WebhookReconciler {
    ledger: Arc<dyn Ledger>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationQueue,
}

impl WebhookReconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            ledger,
            gateway,
            notifications,
        }
    }

    /// Verify and apply one webhook delivery.
    ///
    /// `raw_body` must be the exact bytes received; the signature covers them.
    pub async fn handle(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(signature) = signature else {
            tracing::warn!("Missing webhook signature header");
            return Err(ReconcileError::InvalidSignature);
        };
        if !self.gateway.verify_webhook_signature(signature, raw_body) {
            tracing::warn!("Webhook signature verification failed");
            return Err(ReconcileError::InvalidSignature);
        }

        let event = GatewayEvent::parse(raw_body).map_err(|e| {
            tracing::warn!(error = %e, "Malformed webhook payload");
            e
        })?;
        tracing::debug!(event = event.name(), "Webhook signature verified");

        match event {
            GatewayEvent::ChargeSucceeded(charge) => {
                tracing::info!(
                    reference = %charge.reference,
                    amount = charge.amount,
                    "Processing charge.success"
                );
                let lookup = PaymentLookup {
                    order_id: charge.order_id(),
                    reference: Some(charge.reference.clone()),
                };
                self.settle(&lookup, charge.amount, charge.customer_email())
                    .await
            }
            GatewayEvent::Unrecognized { event } => {
                tracing::debug!(event = %event, "Unhandled webhook event");
                Ok(ReconcileOutcome::Ignored { event })
            }
        }
    }

    /// Ask the gateway about `reference` and settle the order if it was paid
    pub async fn verify_reference(
        &self,
        reference: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let transaction = self.gateway.verify_transaction(reference).await?;
        if !transaction.is_success() {
            tracing::info!(
                reference = %reference,
                gateway_status = %transaction.status,
                "Transaction not successful"
            );
            return Ok(ReconcileOutcome::NotSuccessful {
                gateway_status: transaction.status,
            });
        }

        let lookup = PaymentLookup {
            order_id: transaction.order_id,
            reference: Some(transaction.reference.clone()),
        };
        self.settle(
            &lookup,
            transaction.amount,
            transaction.customer_email.as_deref(),
        )
        .await
    }

    async fn settle(
        &self,
        lookup: &PaymentLookup,
        paid_minor: i64,
        customer_email: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let outcome = match self.ledger.settle_payment(lookup, paid_minor).await? {
            Settlement::Settled(order) => {
                tracing::info!(order_id = %order.id, "Order marked as paid");
                if let Some(recipient) = customer_email
                    .map(str::to_string)
                    .or_else(|| order.customer_email.clone())
                {
                    let message = OrderConfirmation {
                        order_id: order.id,
                        store_id: order.store_id,
                        recipient,
                        total_amount: order.total_amount,
                        reference: order.payment_reference.clone(),
                    };
                    if let Err(e) = self.notifications.enqueue(message) {
                        tracing::warn!(order_id = %order.id, error = %e, "Confirmation not queued");
                    }
                } else {
                    tracing::warn!(order_id = %order.id, "No recipient for order confirmation");
                }
                ReconcileOutcome::Settled { order_id: order.id }
            }
            Settlement::AlreadySettled(status) => {
                tracing::info!(?lookup, status = %status, "Duplicate payment confirmation ignored");
                ReconcileOutcome::AlreadySettled { status }
            }
            Settlement::Underpaid { total, paid } => {
                tracing::warn!(?lookup, total = %total, paid = %paid, "Payment amount mismatch");
                ReconcileOutcome::Underpaid { total, paid }
            }
            Settlement::NotPayable(status) => {
                tracing::warn!(?lookup, status = %status, "Payment received for order that cannot be paid");
                ReconcileOutcome::NotPayable { status }
            }
            Settlement::OrderNotFound => {
                tracing::warn!(?lookup, "Payment confirmation for unknown order");
                ReconcileOutcome::OrderNotFound
            }
        };
        Ok(outcome)
    }
}
