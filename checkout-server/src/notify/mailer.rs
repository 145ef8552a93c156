use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use super::{Notifier, NotifyError, OrderConfirmation};
use crate::config::SmtpConfig;

/// Delivers confirmations over SMTP (STARTTLS relay)
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(message
                .recipient
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(message.recipient.clone()))?)
            .subject(message.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body_text())?;

        self.mailer.send(email).await?;

        tracing::info!(
            to = %message.recipient,
            order_id = %message.order_id,
            "Order confirmation sent"
        );
        Ok(())
    }
}

/// Used when SMTP is not configured: records the message in the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), NotifyError> {
        tracing::info!(
            to = %message.recipient,
            order_id = %message.order_id,
            total = %message.total_amount,
            "SMTP not configured, order confirmation logged only"
        );
        Ok(())
    }
}
