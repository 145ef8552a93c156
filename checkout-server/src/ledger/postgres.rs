//! PostgreSQL ledger
//!
//! Stock and order rows are locked with `SELECT ... FOR UPDATE` inside the
//! enclosing transaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Address, AddressInput, CartItemKey, Order, OrderDetail, OrderItem, OrderStatus,
};
use shared::util::now_millis;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    Ledger, LedgerError, LedgerTx, NewOrder, NewOrderItem, PaymentLookup, Settlement,
    SettlementDecision, decide_settlement,
};

const ORDER_COLUMNS: &str = "id, store_id, user_id, address_id, status, total_amount, \
     payment_reference, customer_email, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    store_id: Uuid,
    user_id: Option<Uuid>,
    address_id: Uuid,
    status: String,
    total_amount: Decimal,
    payment_reference: Option<String>,
    customer_email: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = LedgerError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| LedgerError::Corrupt(e.to_string()))?;
        Ok(Order {
            id: row.id,
            store_id: row.store_id,
            user_id: row.user_id,
            address_id: row.address_id,
            status,
            total_amount: row.total_amount,
            payment_reference: row.payment_reference,
            customer_email: row.customer_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Option<Uuid>,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Address {
            id: row.id,
            user_id: row.user_id,
            street: row.street,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            country: row.country,
        }
    }
}

/// Ledger backed by the `products`/`product_variants`/`orders` tables
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    /// Attach items and shipping addresses to a batch of orders
    async fn with_details(&self, orders: Vec<Order>) -> Result<Vec<OrderDetail>, LedgerError> {
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let address_ids: Vec<Uuid> = orders.iter().map(|o| o.address_id).collect();

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, variant_id, quantity, unit_price
             FROM order_items WHERE order_id = ANY($1)",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let addresses: Vec<AddressRow> = sqlx::query_as(
            "SELECT id, user_id, street, city, state, zip_code, country
             FROM addresses WHERE id = ANY($1)",
        )
        .bind(&address_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in items {
            items_by_order
                .entry(row.order_id)
                .or_default()
                .push(row.into());
        }
        let addresses: HashMap<Uuid, Address> = addresses
            .into_iter()
            .map(|row| (row.id, Address::from(row)))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                address: addresses.get(&order.address_id).cloned(),
                order,
            })
            .collect())
    }
}

async fn lock_order(
    tx: &mut Transaction<'static, Postgres>,
    lookup: &PaymentLookup,
) -> Result<Option<Order>, LedgerError> {
    if let Some(order_id) = lookup.order_id {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(row) = row {
            return row.try_into().map(Some);
        }
    }
    if let Some(reference) = lookup.reference.as_deref() {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_reference = $1 FOR UPDATE"
        ))
        .bind(reference)
        .fetch_optional(&mut **tx)
        .await?;
        return row.map(Order::try_from).transpose();
    }
    Ok(None)
}

async fn restock(
    tx: &mut Transaction<'static, Postgres>,
    order_id: Uuid,
) -> Result<(), LedgerError> {
    sqlx::query(
        "UPDATE product_variants v SET stock_quantity = v.stock_quantity + i.quantity
         FROM order_items i WHERE i.order_id = $1 AND i.variant_id = v.id",
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE products p SET stock_quantity = p.stock_quantity + i.quantity
         FROM order_items i
         WHERE i.order_id = $1 AND i.variant_id IS NULL AND i.product_id = p.id",
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn reserve(
        &mut self,
        store_id: Uuid,
        unit: CartItemKey,
        quantity: u32,
    ) -> Result<Decimal, LedgerError> {
        let requested = i32::try_from(quantity).unwrap_or(i32::MAX);

        let (available, price) = match unit.variant_id {
            Some(variant_id) => {
                let row: Option<(i32, Decimal)> = sqlx::query_as(
                    "SELECT v.stock_quantity, COALESCE(v.specific_price, p.base_price)
                     FROM product_variants v JOIN products p ON p.id = v.product_id
                     WHERE v.id = $1 AND v.product_id = $2 AND p.store_id = $3
                     FOR UPDATE OF v",
                )
                .bind(variant_id)
                .bind(unit.product_id)
                .bind(store_id)
                .fetch_optional(&mut *self.tx)
                .await?;
                row.ok_or(LedgerError::VariantNotFound {
                    product_id: unit.product_id,
                    variant_id,
                })?
            }
            None => {
                let row: Option<(i32, Decimal)> = sqlx::query_as(
                    "SELECT stock_quantity, base_price FROM products
                     WHERE id = $1 AND store_id = $2
                     FOR UPDATE",
                )
                .bind(unit.product_id)
                .bind(store_id)
                .fetch_optional(&mut *self.tx)
                .await?;
                row.ok_or(LedgerError::ProductNotFound(unit.product_id))?
            }
        };

        if available < requested {
            return Err(LedgerError::InsufficientStock {
                unit,
                requested: quantity,
                available,
            });
        }

        match unit.variant_id {
            Some(variant_id) => {
                sqlx::query(
                    "UPDATE product_variants SET stock_quantity = stock_quantity - $1 WHERE id = $2",
                )
                .bind(requested)
                .bind(variant_id)
                .execute(&mut *self.tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $1 WHERE id = $2")
                    .bind(requested)
                    .bind(unit.product_id)
                    .execute(&mut *self.tx)
                    .await?;
            }
        }

        Ok(price)
    }

    async fn resolve_address(
        &mut self,
        owner: Option<Uuid>,
        input: &AddressInput,
    ) -> Result<Uuid, LedgerError> {
        match input {
            AddressInput::Existing { id } => {
                let Some(owner) = owner else {
                    return Err(LedgerError::AddressNotFound(*id));
                };
                let row: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND user_id = $2")
                        .bind(id)
                        .bind(owner)
                        .fetch_optional(&mut *self.tx)
                        .await?;
                row.map(|(id,)| id).ok_or(LedgerError::AddressNotFound(*id))
            }
            AddressInput::New(fields) => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO addresses (id, user_id, street, city, state, zip_code, country, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(id)
                .bind(owner)
                .bind(&fields.street)
                .bind(&fields.city)
                .bind(&fields.state)
                .bind(&fields.zip_code)
                .bind(&fields.country)
                .bind(now_millis())
                .execute(&mut *self.tx)
                .await?;
                Ok(id)
            }
        }
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, LedgerError> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (id, store_id, user_id, address_id, status, total_amount,
                                 customer_email, created_at, updated_at)
             VALUES ($1, $2, $3, $4, 'PENDING', $5, $6, $7, $7)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .bind(order.store_id)
        .bind(order.user_id)
        .bind(order.address_id)
        .bind(order.total_amount)
        .bind(&order.customer_email)
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn insert_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, LedgerError> {
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let row: OrderItemRow = sqlx::query_as(
                "INSERT INTO order_items (id, order_id, product_id, variant_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, order_id, product_id, variant_id, quantity, unit_price",
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.unit_price)
            .fetch_one(&mut *self.tx)
            .await?;
            rows.push(row.into());
        }
        Ok(rows)
    }

    async fn set_payment_reference(
        &mut self,
        order_id: Uuid,
        reference: &str,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE orders SET payment_reference = $1 WHERE id = $2")
            .bind(reference)
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let PgLedgerTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        let PgLedgerTx { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn store_exists(&self, store_id: Uuid) -> Result<bool, LedgerError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_orders(
        &self,
        store_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<OrderDetail>, LedgerError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE store_id = $1 AND ($2::uuid IS NULL OR user_id = $2)
             ORDER BY created_at DESC"
        ))
        .bind(store_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_details(orders).await
    }

    async fn find_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<OrderDetail>, LedgerError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2"
        ))
        .bind(order_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;
        Ok(self.with_details(vec![order]).await?.pop())
    }

    async fn update_status(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2 FOR UPDATE"
        ))
        .bind(order_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = Order::try_from(row.ok_or(LedgerError::OrderNotFound(order_id))?)?;

        if !current.status.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        if next == OrderStatus::Cancelled {
            restock(&mut tx, order_id).await?;
        }

        let row: OrderRow = sqlx::query_as(&format!(
            "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(next.as_str())
        .bind(now_millis())
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn settle_payment(
        &self,
        lookup: &PaymentLookup,
        paid_minor: i64,
    ) -> Result<Settlement, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let Some(order) = lock_order(&mut tx, lookup).await? else {
            return Ok(Settlement::OrderNotFound);
        };

        let settlement = match decide_settlement(order.status, order.total_amount, paid_minor) {
            SettlementDecision::MarkPaid => {
                let row: OrderRow = sqlx::query_as(&format!(
                    "UPDATE orders SET status = 'PAID', updated_at = $1 WHERE id = $2
                     RETURNING {ORDER_COLUMNS}"
                ))
                .bind(now_millis())
                .bind(order.id)
                .fetch_one(&mut *tx)
                .await?;
                Settlement::Settled(row.try_into()?)
            }
            SettlementDecision::AlreadySettled => Settlement::AlreadySettled(order.status),
            SettlementDecision::NotPayable => Settlement::NotPayable(order.status),
            SettlementDecision::Underpaid => Settlement::Underpaid {
                total: order.total_amount,
                paid: shared::money::from_minor_units(paid_minor),
            },
        };

        tx.commit().await?;
        Ok(settlement)
    }
}
