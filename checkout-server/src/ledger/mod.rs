//! Order and inventory persistence
//!
//! [`Ledger`] is the durable side of checkout: stock counts, orders and their
//! line items. Order creation runs through a [`LedgerTx`] so that stock
//! decrements, the order row and its items become visible together or not at
//! all. Stock rows are locked for the lifetime of the transaction, which
//! serializes concurrent reservations of the same unit.

mod postgres;

pub use postgres::PgLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{AddressInput, CartItemKey, Order, OrderDetail, OrderItem, OrderStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("variant {variant_id} not found for product {product_id}")]
    VariantNotFound { product_id: Uuid, variant_id: Uuid },

    #[error("insufficient stock for {unit}: requested {requested}, available {available}")]
    InsufficientStock {
        unit: CartItemKey,
        requested: u32,
        available: i32,
    },

    #[error("address {0} not found")]
    AddressNotFound(Uuid),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// Infrastructure failures as opposed to business rejections
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Corrupt(_))
    }
}

/// Order header as inserted by checkout
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub store_id: Uuid,
    pub user_id: Option<Uuid>,
    pub address_id: Uuid,
    pub total_amount: Decimal,
    pub customer_email: Option<String>,
    pub created_at: i64,
}

/// One reserved cart line with its captured unit price
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// How a gateway payment points back at an order
#[derive(Debug, Clone, Default)]
pub struct PaymentLookup {
    /// `orderId` from the payment metadata
    pub order_id: Option<Uuid>,
    /// Gateway transaction reference
    pub reference: Option<String>,
}

/// Outcome of applying a confirmed payment to an order
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The order moved from `PENDING` to `PAID`
    Settled(Order),
    /// Duplicate confirmation; the order was already paid or further along
    AlreadySettled(OrderStatus),
    /// Paid amount does not cover the order total
    Underpaid { total: Decimal, paid: Decimal },
    /// Order can no longer accept payment (cancelled)
    NotPayable(OrderStatus),
    OrderNotFound,
}

/// What to do with a confirmed payment for an order in `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementDecision {
    MarkPaid,
    AlreadySettled,
    Underpaid,
    NotPayable,
}

/// Shared settlement rule for every ledger backend.
///
/// Status is checked before amount so that duplicate deliveries stay no-ops.
pub fn decide_settlement(status: OrderStatus, total: Decimal, paid_minor: i64) -> SettlementDecision {
    if status.is_paid_or_later() {
        SettlementDecision::AlreadySettled
    } else if status != OrderStatus::Pending {
        SettlementDecision::NotPayable
    } else if !shared::money::covers_total(paid_minor, total) {
        SettlementDecision::Underpaid
    } else {
        SettlementDecision::MarkPaid
    }
}

/// Unit of work for order creation
#[async_trait]
pub trait LedgerTx: Send {
    /// Lock the stock row for `unit`, check and decrement it, return the unit price.
    ///
    /// Variant price overrides the product base price when set.
    async fn reserve(
        &mut self,
        store_id: Uuid,
        unit: CartItemKey,
        quantity: u32,
    ) -> Result<Decimal, LedgerError>;

    /// Existing address owned by `owner`, or a new one created from inline fields
    async fn resolve_address(
        &mut self,
        owner: Option<Uuid>,
        input: &AddressInput,
    ) -> Result<Uuid, LedgerError>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, LedgerError>;

    async fn insert_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, LedgerError>;

    async fn set_payment_reference(
        &mut self,
        order_id: Uuid,
        reference: &str,
    ) -> Result<(), LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    async fn store_exists(&self, store_id: Uuid) -> Result<bool, LedgerError>;

    /// Orders of a store, newest first; restricted to one customer when `user_id` is set
    async fn list_orders(
        &self,
        store_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<OrderDetail>, LedgerError>;

    async fn find_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<OrderDetail>, LedgerError>;

    /// Administrative status change under the order row lock.
    ///
    /// Cancelling returns the order's reserved stock in the same transaction.
    async fn update_status(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, LedgerError>;

    /// Apply a confirmed payment of `paid_minor` minor units, idempotently
    async fn settle_payment(
        &self,
        lookup: &PaymentLookup,
        paid_minor: i64,
    ) -> Result<Settlement, LedgerError>;
}
