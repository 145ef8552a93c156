//! Cart models
//!
//! A cart is a per-store, per-shopper map from [`CartItemKey`] to quantity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum quantity of a single cart line
pub const MAX_CART_QUANTITY: u32 = 9999;

/// Identity of a cart line: `productId` or `productId:variantId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CartItemKey {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
}

impl CartItemKey {
    pub fn new(product_id: Uuid, variant_id: Option<Uuid>) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }
}

impl fmt::Display for CartItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_id {
            Some(variant_id) => write!(f, "{}:{}", self.product_id, variant_id),
            None => write!(f, "{}", self.product_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cart item key: {0}")]
pub struct InvalidCartItemKey(pub String);

impl FromStr for CartItemKey {
    type Err = InvalidCartItemKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCartItemKey(s.to_string());
        let (product, variant) = match s.split_once(':') {
            Some((product, variant)) => (product, Some(variant)),
            None => (s, None),
        };
        let product_id = Uuid::parse_str(product).map_err(|_| invalid())?;
        let variant_id = variant
            .map(|v| Uuid::parse_str(v).map_err(|_| invalid()))
            .transpose()?;
        Ok(Self::new(product_id, variant_id))
    }
}

impl From<CartItemKey> for String {
    fn from(key: CartItemKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CartItemKey {
    type Error = InvalidCartItemKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One cart line as stored and returned to the shopper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
}

impl CartEntry {
    pub fn key(&self) -> CartItemKey {
        CartItemKey::new(self.product_id, self.variant_id)
    }
}

/// `GET /cart` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartEntry>,
}

/// `POST /cart/add` body; quantity is validated by the cart store
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

/// `PATCH /cart/item` body; a quantity of zero or less removes the line
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub item_key: CartItemKey,
    pub quantity: i64,
}

/// `DELETE /cart/item` body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemRequest {
    pub item_key: CartItemKey,
}
