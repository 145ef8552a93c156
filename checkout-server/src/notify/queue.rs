use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{Notifier, NotifyError, OrderConfirmation};

/// Fire-and-forget handle onto the notification worker
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<OrderConfirmation>,
}

impl NotificationQueue {
    /// Start the worker with room for `capacity` pending messages. It exits
    /// once every queue handle has been dropped and the backlog is drained.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        capacity: usize,
        max_attempts: u32,
        base_delay: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<OrderConfirmation>(capacity.max(1));
        let max_attempts = max_attempts.max(1);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                deliver(notifier.as_ref(), &message, max_attempts, base_delay).await;
            }
            tracing::debug!("Notification worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue without waiting; a full backlog drops the message
    pub fn enqueue(&self, message: OrderConfirmation) -> Result<(), NotifyError> {
        let order_id = message.order_id;
        match self.tx.try_send(message) {
            Ok(()) => {
                tracing::debug!(order_id = %order_id, "Order confirmation queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    order_id = %order_id,
                    capacity = self.tx.max_capacity(),
                    "Notification backlog full, confirmation dropped"
                );
                Err(NotifyError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(NotifyError::QueueClosed),
        }
    }
}

async fn deliver(
    notifier: &dyn Notifier,
    message: &OrderConfirmation,
    max_attempts: u32,
    base_delay: Duration,
) {
    let mut delay = base_delay;
    for attempt in 1..=max_attempts {
        match notifier.send_order_confirmation(message).await {
            Ok(()) => return,
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    order_id = %message.order_id,
                    attempt,
                    error = %e,
                    "Order confirmation failed, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(e) => {
                tracing::error!(
                    order_id = %message.order_id,
                    attempts = max_attempts,
                    error = %e,
                    "Order confirmation abandoned"
                );
            }
        }
    }
}
