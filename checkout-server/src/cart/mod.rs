//! Shopping carts
//!
//! Carts are ephemeral: keyed by store and shopper, expiring after a fixed
//! retention window that every write resets. The order pipeline only ever
//! reads a snapshot and clears it after a successful checkout.

mod moka_store;

pub use moka_store::MokaCartStore;

use async_trait::async_trait;
use shared::models::{CartEntry, CartItemKey, MAX_CART_QUANTITY};
use thiserror::Error;
use uuid::Uuid;

/// Who a cart belongs to inside a store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    Customer(Uuid),
    Guest(String),
}

/// Storage key `cart:{store}:{user:<id>|session:<token>}`
pub fn cart_key(store_id: Uuid, owner: &CartOwner) -> String {
    match owner {
        CartOwner::Customer(user_id) => format!("cart:{store_id}:user:{user_id}"),
        CartOwner::Guest(session) => format!("cart:{store_id}:session:{session}"),
    }
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("item {0} not found in cart")]
    ItemNotFound(CartItemKey),

    #[error("quantity must be between 1 and 9999, got {0}")]
    InvalidQuantity(i64),
}

/// Reject quantities outside `1..=MAX_CART_QUANTITY`
pub fn check_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_CART_QUANTITY).contains(q))
        .ok_or(CartError::InvalidQuantity(quantity))
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Merge `entry` into the cart: quantities add up for the same item key
    async fn add(&self, store_id: Uuid, owner: &CartOwner, entry: CartEntry)
    -> Result<(), CartError>;

    /// Current contents; empty when the cart is absent or expired
    async fn read(&self, store_id: Uuid, owner: &CartOwner) -> Result<Vec<CartEntry>, CartError>;

    /// Overwrite a line's quantity; zero or less removes the line
    async fn update_quantity(
        &self,
        store_id: Uuid,
        owner: &CartOwner,
        key: CartItemKey,
        quantity: i64,
    ) -> Result<(), CartError>;

    async fn remove(
        &self,
        store_id: Uuid,
        owner: &CartOwner,
        key: CartItemKey,
    ) -> Result<(), CartError>;

    async fn clear(&self, store_id: Uuid, owner: &CartOwner) -> Result<(), CartError>;
}
