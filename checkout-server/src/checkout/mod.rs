//! Checkout pipeline: order creation and payment reconciliation

mod coordinator;
mod reconciler;

pub use coordinator::{CheckoutError, OrderCoordinator};
pub use reconciler::{ReconcileError, ReconcileOutcome, WebhookReconciler};
