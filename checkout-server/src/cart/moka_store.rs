use async_trait::async_trait;
use moka::future::Cache;
use shared::models::{CartEntry, CartItemKey};
use std::time::Duration;
use uuid::Uuid;

use super::{CartError, CartOwner, CartStore, cart_key, check_quantity};

/// In-process cart store with a per-entry time-to-live.
///
/// Every write re-inserts the whole cart, which restarts its TTL. Reads do not
/// extend it.
#[derive(Clone)]
pub struct MokaCartStore {
    cache: Cache<String, Vec<CartEntry>>,
}

impl MokaCartStore {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    async fn load(&self, key: &str) -> Vec<CartEntry> {
        self.cache.get(key).await.unwrap_or_default()
    }

    async fn store(&self, key: String, items: Vec<CartEntry>) {
        if items.is_empty() {
            self.cache.invalidate(&key).await;
        } else {
            self.cache.insert(key, items).await;
        }
    }
}

#[async_trait]
impl CartStore for MokaCartStore {
    async fn add(
        &self,
        store_id: Uuid,
        owner: &CartOwner,
        entry: CartEntry,
    ) -> Result<(), CartError> {
        check_quantity(i64::from(entry.quantity))?;
        let key = cart_key(store_id, owner);
        let mut items = self.load(&key).await;

        match items.iter_mut().find(|e| e.key() == entry.key()) {
            Some(existing) => {
                let merged = i64::from(existing.quantity) + i64::from(entry.quantity);
                existing.quantity = check_quantity(merged)?;
            }
            None => items.push(entry),
        }

        self.store(key, items).await;
        Ok(())
    }

    async fn read(&self, store_id: Uuid, owner: &CartOwner) -> Result<Vec<CartEntry>, CartError> {
        Ok(self.load(&cart_key(store_id, owner)).await)
    }

    async fn update_quantity(
        &self,
        store_id: Uuid,
        owner: &CartOwner,
        item: CartItemKey,
        quantity: i64,
    ) -> Result<(), CartError> {
        let key = cart_key(store_id, owner);
        let mut items = self.load(&key).await;
        let pos = items
            .iter()
            .position(|e| e.key() == item)
            .ok_or(CartError::ItemNotFound(item))?;

        if quantity <= 0 {
            items.remove(pos);
        } else {
            items[pos].quantity = check_quantity(quantity)?;
        }

        self.store(key, items).await;
        Ok(())
    }

    async fn remove(
        &self,
        store_id: Uuid,
        owner: &CartOwner,
        item: CartItemKey,
    ) -> Result<(), CartError> {
        let key = cart_key(store_id, owner);
        let mut items = self.load(&key).await;
        items.retain(|e| e.key() != item);
        self.store(key, items).await;
        Ok(())
    }

    async fn clear(&self, store_id: Uuid, owner: &CartOwner) -> Result<(), CartError> {
        self.cache.invalidate(&cart_key(store_id, owner)).await;
        Ok(())
    }
}
