//! Webhook event payloads

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeCustomer {
    #[serde(default)]
    pub email: Option<String>,
}

/// `data` object of a `charge.success` event
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeData {
    pub reference: String,
    /// Amount paid in minor units
    pub amount: i64,
    /// Free-form; Paystack echoes whatever was sent on initialize (or `""`)
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub customer: Option<ChargeCustomer>,
}

impl ChargeData {
    /// `metadata.orderId`, when present and well-formed
    pub fn order_id(&self) -> Option<Uuid> {
        metadata_order_id(&self.metadata)
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .filter(|e| !e.is_empty())
    }
}

pub(crate) fn metadata_order_id(metadata: &Value) -> Option<Uuid> {
    metadata
        .get("orderId")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Inbound gateway event
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    ChargeSucceeded(ChargeData),
    /// Any other event type; acknowledged without side effects
    Unrecognized { event: String },
}

impl GatewayEvent {
    pub fn parse(raw_body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(raw_body)?;
        match raw.event.as_str() {
            "charge.success" => Ok(Self::ChargeSucceeded(serde_json::from_value(raw.data)?)),
            _ => Ok(Self::Unrecognized { event: raw.event }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ChargeSucceeded(_) => "charge.success",
            Self::Unrecognized { event } => event,
        }
    }
}
