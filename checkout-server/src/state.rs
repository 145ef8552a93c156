//! Application state for checkout-server

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;

use crate::cart::{CartStore, MokaCartStore};
use crate::checkout::{OrderCoordinator, WebhookReconciler};
use crate::config::Config;
use crate::ledger::{Ledger, PgLedger};
use crate::notify::{LogMailer, NotificationQueue, Notifier, SmtpMailer};
use crate::payment::{PaymentGateway, PaystackGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// First retry delay for notification delivery; doubles per attempt
const NOTIFY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub carts: Arc<dyn CartStore>,
    pub coordinator: Arc<OrderCoordinator>,
    pub reconciler: Arc<WebhookReconciler>,
    /// JWT secret for customer authentication
    pub jwt_secret: Arc<SecretString>,
}

/// Collaborators the state is assembled from
pub struct Components {
    pub ledger: Arc<dyn Ledger>,
    pub carts: Arc<dyn CartStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifications: NotificationQueue,
    pub jwt_secret: SecretString,
    pub guest_email_placeholder: String,
}

/// Long-lived resources owned by `main` and closed after the server stops
pub struct Background {
    pool: PgPool,
    notification_worker: JoinHandle<()>,
}

impl Background {
    pub fn new(pool: PgPool, notification_worker: JoinHandle<()>) -> Self {
        Self {
            pool,
            notification_worker,
        }
    }

    /// Wait up to `grace` for queued confirmations, then close the pool.
    ///
    /// Every [`AppState`] clone must be dropped first; the worker only stops
    /// once the last queue handle is gone.
    pub async fn shutdown(self, grace: Duration) {
        let Self {
            pool,
            mut notification_worker,
        } = self;

        match tokio::time::timeout(grace, &mut notification_worker).await {
            Ok(Ok(())) => tracing::info!("Notification backlog drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Notification worker failed"),
            Err(_) => {
                tracing::warn!(?grace, "Notification backlog not drained in time, aborting");
                notification_worker.abort();
            }
        }

        pool.close().await;
        tracing::info!("Database pool closed");
    }
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and wire the pipeline
    pub async fn new(config: &Config) -> Result<(Self, Background), BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        PgLedger::migrate(&pool).await?;
        tracing::info!("Database migrations applied");

        let gateway = PaystackGateway::new(
            config.paystack_base_url.clone(),
            SecretString::from(config.paystack_secret_key.expose_secret().to_string()),
            config.payment_callback_url.clone(),
            config.gateway_timeout,
        )?;

        let notifier: Arc<dyn Notifier> = match &config.smtp {
            Some(smtp) => {
                tracing::info!(host = %smtp.host, "Order confirmations via SMTP");
                Arc::new(SmtpMailer::new(smtp)?)
            }
            None => {
                tracing::warn!("SMTP not configured, order confirmations will only be logged");
                Arc::new(LogMailer)
            }
        };
        let (notifications, worker) = NotificationQueue::spawn(
            notifier,
            config.notify_queue_capacity,
            config.notify_max_attempts,
            NOTIFY_BASE_DELAY,
        );

        let state = Self::from_components(Components {
            ledger: Arc::new(PgLedger::new(pool.clone())),
            carts: Arc::new(MokaCartStore::new(config.cart_ttl, config.cart_max_capacity)),
            gateway: Arc::new(gateway),
            notifications,
            jwt_secret: SecretString::from(config.jwt_secret.expose_secret().to_string()),
            guest_email_placeholder: config.guest_email_placeholder.clone(),
        });
        Ok((state, Background::new(pool, worker)))
    }

    pub fn from_components(components: Components) -> Self {
        let Components {
            ledger,
            carts,
            gateway,
            notifications,
            jwt_secret,
            guest_email_placeholder,
        } = components;

        let coordinator = OrderCoordinator::new(
            carts.clone(),
            ledger.clone(),
            gateway.clone(),
            guest_email_placeholder,
        );
        let reconciler = WebhookReconciler::new(ledger.clone(), gateway, notifications);

        Self {
            ledger,
            carts,
            coordinator: Arc::new(coordinator),
            reconciler: Arc::new(reconciler),
            jwt_secret: Arc::new(jwt_secret),
        }
    }
}
