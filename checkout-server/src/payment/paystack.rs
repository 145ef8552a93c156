//! Paystack integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha512;
use std::time::Duration;

use super::event::metadata_order_id;
use super::{PaymentError, PaymentGateway, PaymentIntent, PaymentMetadata, VerifiedTransaction};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    #[serde(default)]
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    status: String,
    amount: i64,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    customer: Option<super::ChargeCustomer>,
}

/// Paystack REST client
pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
    callback_url: Option<String>,
    timeout: Duration,
}

impl PaystackGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: SecretString,
        callback_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
            callback_url,
            timeout,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> PaymentError {
        if e.is_timeout() {
            PaymentError::Timeout(self.timeout)
        } else {
            PaymentError::Transport(e)
        }
    }

    /// Read a Paystack envelope, turning non-2xx and `status: false` into `Rejected`
    async fn read_envelope<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.map_send_error(e))?;

        let envelope: Envelope<T> = match serde_json::from_slice(&body) {
            Ok(env) => env,
            Err(e) if status.is_success() => return Err(PaymentError::Malformed(e.to_string())),
            Err(_) => {
                return Err(PaymentError::Rejected {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&body).into_owned(),
                });
            }
        };

        if !status.is_success() || !envelope.status {
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message: envelope.message,
            });
        }
        envelope
            .data
            .ok_or_else(|| PaymentError::Malformed("missing data".into()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        email: &str,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        let minor = shared::money::to_minor_units(amount).ok_or(PaymentError::InvalidAmount(amount))?;

        let mut body = json!({
            "email": email,
            "amount": minor,
            "metadata": metadata,
        });
        if let Some(callback_url) = &self.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        let resp = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let data: InitializeData = self.read_envelope(resp).await?;
        tracing::debug!(reference = %data.reference, amount = minor, "Paystack transaction initialized");

        Ok(PaymentIntent {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, PaymentError> {
        let resp = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let data: VerifyData = self.read_envelope(resp).await?;

        Ok(VerifiedTransaction {
            order_id: metadata_order_id(&data.metadata),
            customer_email: data.customer.and_then(|c| c.email),
            reference: data.reference,
            status: data.status,
            amount: data.amount,
        })
    }

    fn verify_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        verify_signature(self.secret_key.expose_secret().as_bytes(), signature, raw_body)
    }
}

/// Hex HMAC-SHA512 of `payload`, as sent in `x-paystack-signature`
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match Hmac::<Sha512>::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex HMAC-SHA512 signature over the raw payload
pub fn verify_signature(secret: &[u8], signature: &str, payload: &[u8]) -> bool {
    let Ok(sig_bytes) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&sig_bytes).is_ok()
}
