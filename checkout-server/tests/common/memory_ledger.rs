//! In-memory ledger for tests that do not need a database.
//!
//! A transaction holds the ledger mutex for its whole lifetime and works on a
//! staged copy of the data, published on commit. Dropping the transaction
//! discards the copy.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Address, AddressInput, CartItemKey, Order, OrderDetail, OrderItem, OrderStatus,
};
use shared::util::now_millis;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use checkout_server::ledger::{
    Ledger, LedgerError, LedgerTx, NewOrder, NewOrderItem, PaymentLookup, Settlement,
    SettlementDecision, decide_settlement,
};

#[derive(Debug, Clone)]
struct ProductRecord {
    store_id: Uuid,
    base_price: Decimal,
    stock: i32,
}

#[derive(Debug, Clone)]
struct VariantRecord {
    product_id: Uuid,
    specific_price: Option<Decimal>,
    stock: i32,
}

#[derive(Debug, Clone, Default)]
struct LedgerData {
    stores: HashSet<Uuid>,
    products: HashMap<Uuid, ProductRecord>,
    variants: HashMap<Uuid, VariantRecord>,
    addresses: HashMap<Uuid, Address>,
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
}

impl LedgerData {
    fn detail(&self, order: &Order) -> OrderDetail {
        OrderDetail {
            order: order.clone(),
            items: self
                .items
                .iter()
                .filter(|i| i.order_id == order.id)
                .cloned()
                .collect(),
            address: self.addresses.get(&order.address_id).cloned(),
        }
    }

    fn restock(&mut self, order_id: Uuid) {
        let lines: Vec<(Uuid, Option<Uuid>, i32)> = self
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| (i.product_id, i.variant_id, i.quantity))
            .collect();
        for (product_id, variant_id, quantity) in lines {
            match variant_id {
                Some(v) => {
                    if let Some(variant) = self.variants.get_mut(&v) {
                        variant.stock += quantity;
                    }
                }
                None => {
                    if let Some(product) = self.products.get_mut(&product_id) {
                        product.stock += quantity;
                    }
                }
            }
        }
    }

    fn lookup_order(&self, lookup: &PaymentLookup) -> Option<Uuid> {
        lookup
            .order_id
            .filter(|id| self.orders.contains_key(id))
            .or_else(|| {
                let reference = lookup.reference.as_deref()?;
                self.orders
                    .values()
                    .find(|o| o.payment_reference.as_deref() == Some(reference))
                    .map(|o| o.id)
            })
    }
}

/// Mutex-guarded ledger living entirely in memory
#[derive(Clone, Default)]
pub struct MemoryLedger {
    data: Arc<Mutex<LedgerData>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    pub async fn add_store(&self, store_id: Uuid) {
        self.data.lock().await.stores.insert(store_id);
    }

    pub async fn add_product(&self, store_id: Uuid, product_id: Uuid, base_price: Decimal, stock: i32) {
        self.data.lock().await.products.insert(
            product_id,
            ProductRecord {
                store_id,
                base_price,
                stock,
            },
        );
    }

    pub async fn add_variant(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
        specific_price: Option<Decimal>,
        stock: i32,
    ) {
        self.data.lock().await.variants.insert(
            variant_id,
            VariantRecord {
                product_id,
                specific_price,
                stock,
            },
        );
    }

    pub async fn add_address(&self, address: Address) {
        self.data
            .lock()
            .await
            .addresses
            .insert(address.id, address);
    }

    /// Catalog price change, as an administrator would make it
    pub async fn set_price(&self, unit: CartItemKey, price: Decimal) {
        let mut data = self.data.lock().await;
        match unit.variant_id {
            Some(v) => {
                if let Some(variant) = data.variants.get_mut(&v) {
                    variant.specific_price = Some(price);
                }
            }
            None => {
                if let Some(product) = data.products.get_mut(&unit.product_id) {
                    product.base_price = price;
                }
            }
        }
    }

    // ========== Inspection ==========

    pub async fn stock_of(&self, unit: CartItemKey) -> Option<i32> {
        let data = self.data.lock().await;
        match unit.variant_id {
            Some(v) => data.variants.get(&v).map(|r| r.stock),
            None => data.products.get(&unit.product_id).map(|r| r.stock),
        }
    }

    pub async fn order_count(&self) -> usize {
        self.data.lock().await.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.data.lock().await.items.len()
    }

    pub async fn address_count(&self) -> usize {
        self.data.lock().await.addresses.len()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<LedgerData>,
    staged: LedgerData,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn reserve(
        &mut self,
        store_id: Uuid,
        unit: CartItemKey,
        quantity: u32,
    ) -> Result<Decimal, LedgerError> {
        let product = self
            .staged
            .products
            .get(&unit.product_id)
            .filter(|p| p.store_id == store_id)
            .cloned()
            .ok_or(LedgerError::ProductNotFound(unit.product_id))?;

        let (stock, price) = match unit.variant_id {
            Some(variant_id) => {
                let variant = self
                    .staged
                    .variants
                    .get_mut(&variant_id)
                    .filter(|v| v.product_id == unit.product_id)
                    .ok_or(LedgerError::VariantNotFound {
                        product_id: unit.product_id,
                        variant_id,
                    })?;
                let price = variant.specific_price.unwrap_or(product.base_price);
                (&mut variant.stock, price)
            }
            None => {
                let record = self
                    .staged
                    .products
                    .get_mut(&unit.product_id)
                    .ok_or(LedgerError::ProductNotFound(unit.product_id))?;
                (&mut record.stock, product.base_price)
            }
        };

        let requested = i32::try_from(quantity).unwrap_or(i32::MAX);
        if *stock < requested {
            return Err(LedgerError::InsufficientStock {
                unit,
                requested: quantity,
                available: *stock,
            });
        }
        *stock -= requested;
        Ok(price)
    }

    async fn resolve_address(
        &mut self,
        owner: Option<Uuid>,
        input: &AddressInput,
    ) -> Result<Uuid, LedgerError> {
        match input {
            AddressInput::Existing { id } => self
                .staged
                .addresses
                .get(id)
                .filter(|a| owner.is_some() && a.user_id == owner)
                .map(|a| a.id)
                .ok_or(LedgerError::AddressNotFound(*id)),
            AddressInput::New(fields) => {
                let address = Address {
                    id: Uuid::new_v4(),
                    user_id: owner,
                    street: fields.street.clone(),
                    city: fields.city.clone(),
                    state: fields.state.clone(),
                    zip_code: fields.zip_code.clone(),
                    country: fields.country.clone(),
                };
                let id = address.id;
                self.staged.addresses.insert(id, address);
                Ok(id)
            }
        }
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, LedgerError> {
        let row = Order {
            id: order.id,
            store_id: order.store_id,
            user_id: order.user_id,
            address_id: order.address_id,
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            payment_reference: None,
            customer_email: order.customer_email.clone(),
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        self.staged.orders.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, LedgerError> {
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
                unit_price: item.unit_price,
            })
            .collect();
        self.staged.items.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn set_payment_reference(
        &mut self,
        order_id: Uuid,
        reference: &str,
    ) -> Result<(), LedgerError> {
        let order = self
            .staged
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        order.payment_reference = Some(reference.to_string());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let guard = self.data.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn store_exists(&self, store_id: Uuid) -> Result<bool, LedgerError> {
        Ok(self.data.lock().await.stores.contains(&store_id))
    }

    async fn list_orders(
        &self,
        store_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<OrderDetail>, LedgerError> {
        let data = self.data.lock().await;
        let mut orders: Vec<&Order> = data
            .orders
            .values()
            .filter(|o| o.store_id == store_id)
            .filter(|o| user_id.is_none() || o.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders.into_iter().map(|o| data.detail(o)).collect())
    }

    async fn find_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<OrderDetail>, LedgerError> {
        let data = self.data.lock().await;
        Ok(data
            .orders
            .get(&order_id)
            .filter(|o| o.store_id == store_id)
            .map(|o| data.detail(o)))
    }

    async fn update_status(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, LedgerError> {
        let mut data = self.data.lock().await;
        let current = data
            .orders
            .get(&order_id)
            .filter(|o| o.store_id == store_id)
            .map(|o| o.status)
            .ok_or(LedgerError::OrderNotFound(order_id))?;

        if !current.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        if next == OrderStatus::Cancelled {
            data.restock(order_id);
        }

        let order = data
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        order.status = next;
        order.updated_at = now_millis();
        Ok(order.clone())
    }

    async fn settle_payment(
        &self,
        lookup: &PaymentLookup,
        paid_minor: i64,
    ) -> Result<Settlement, LedgerError> {
        let mut data = self.data.lock().await;
        let Some(order_id) = data.lookup_order(lookup) else {
            return Ok(Settlement::OrderNotFound);
        };
        let Some(order) = data.orders.get_mut(&order_id) else {
            return Ok(Settlement::OrderNotFound);
        };

        Ok(
            match decide_settlement(order.status, order.total_amount, paid_minor) {
                SettlementDecision::MarkPaid => {
                    order.status = OrderStatus::Paid;
                    order.updated_at = now_millis();
                    Settlement::Settled(order.clone())
                }
                SettlementDecision::AlreadySettled => Settlement::AlreadySettled(order.status),
                SettlementDecision::NotPayable => Settlement::NotPayable(order.status),
                SettlementDecision::Underpaid => Settlement::Underpaid {
                    total: order.total_amount,
                    paid: shared::money::from_minor_units(paid_minor),
                },
            },
        )
    }
}
