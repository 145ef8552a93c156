//! Cart to order conversion

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{
    AddressInput, CheckoutReceipt, CreateOrderRequest, Order, OrderDetail, OrderStatus,
};
use shared::money::line_total;
use shared::util::now_millis;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Actor;
use crate::cart::{CartError, CartStore};
use crate::ledger::{Ledger, LedgerError, LedgerTx, NewOrder, NewOrderItem};
use crate::payment::{PaymentError, PaymentGateway, PaymentIntent, PaymentMetadata};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("address field `{0}` must not be blank")]
    BlankAddressField(&'static str),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("payment initiation failed: {0}")]
    PaymentInitiation(#[from] PaymentError),

    #[error("authentication required")]
    NotAuthenticated,

    #[error("order {0} belongs to another customer")]
    NotOrderOwner(Uuid),

    #[error("store administrator role required")]
    AdminRequired,
}

/// Orchestrates checkout: cart snapshot, stock reservation, order rows and
/// payment initiation as one unit of work.
pub struct OrderCoordinator {
    carts: Arc<dyn CartStore>,
    ledger: Arc<dyn Ledger>,
    gateway: Arc<dyn PaymentGateway>,
    guest_email_placeholder: String,
}

/// Everything staged inside the transaction before commit
struct Staged {
    order: Order,
    intent: PaymentIntent,
}

impl OrderCoordinator {
    pub fn new(
        carts: Arc<dyn CartStore>,
        ledger: Arc<dyn Ledger>,
        gateway: Arc<dyn PaymentGateway>,
        guest_email_placeholder: impl Into<String>,
    ) -> Self {
        Self {
            carts,
            ledger,
            gateway,
            guest_email_placeholder: guest_email_placeholder.into(),
        }
    }

    /// Turn the actor's cart into a `PENDING` order and a hosted payment session.
    ///
    /// Nothing is persisted unless every step succeeds. The cart is cleared
    /// only after commit and a failure to clear it does not fail the checkout.
    pub async fn create_order(
        &self,
        store_id: Uuid,
        actor: &Actor,
        request: CreateOrderRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        if let AddressInput::New(address) = &request.address {
            if let Some(field) = address.first_blank_field() {
                return Err(CheckoutError::BlankAddressField(field));
            }
        }

        let owner = actor.cart_owner();
        let mut entries = self.carts.read(store_id, &owner).await?;
        if entries.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        // Fixed lock order across concurrent checkouts
        entries.sort_by_key(|e| e.key());

        let contact_email = actor
            .email()
            .map(str::to_string)
            .or_else(|| {
                request
                    .email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
            });

        let mut tx = self.ledger.begin().await?;
        let staged = self
            .stage(&mut *tx, store_id, actor, &request, &entries, contact_email)
            .await;

        let Staged { order, intent } = match staged {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Checkout rollback failed");
                }
                tracing::info!(store_id = %store_id, error = %e, "Checkout aborted");
                return Err(e);
            }
        };
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            store_id = %store_id,
            total = %order.total_amount,
            reference = %intent.reference,
            "Order created"
        );

        if let Err(e) = self.carts.clear(store_id, &owner).await {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to clear cart after checkout");
        }

        Ok(CheckoutReceipt {
            order,
            authorization_url: intent.authorization_url,
            reference: intent.reference,
        })
    }

    async fn stage(
        &self,
        tx: &mut dyn LedgerTx,
        store_id: Uuid,
        actor: &Actor,
        request: &CreateOrderRequest,
        entries: &[shared::models::CartEntry],
        contact_email: Option<String>,
    ) -> Result<Staged, CheckoutError> {
        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let unit_price = tx.reserve(store_id, entry.key(), entry.quantity).await?;
            total += line_total(unit_price, entry.quantity);
            items.push(NewOrderItem {
                product_id: entry.product_id,
                variant_id: entry.variant_id,
                quantity: entry.quantity,
                unit_price,
            });
        }

        let address_id = tx.resolve_address(actor.user_id(), &request.address).await?;

        let mut order = tx
            .insert_order(&NewOrder {
                id: Uuid::new_v4(),
                store_id,
                user_id: actor.user_id(),
                address_id,
                total_amount: total,
                customer_email: contact_email.clone(),
                created_at: now_millis(),
            })
            .await?;
        tx.insert_items(order.id, &items).await?;

        let email = contact_email.unwrap_or_else(|| self.guest_email_placeholder.clone());
        let metadata = PaymentMetadata {
            order_id: order.id,
            tenant_id: store_id,
        };
        let intent = self.gateway.initialize(&email, total, &metadata).await?;

        tx.set_payment_reference(order.id, &intent.reference).await?;
        order.payment_reference = Some(intent.reference.clone());

        Ok(Staged { order, intent })
    }

    /// Store orders for admins; the caller's own orders for customers
    pub async fn get_orders(
        &self,
        store_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<OrderDetail>, CheckoutError> {
        let Some(user_id) = actor.user_id() else {
            return Err(CheckoutError::NotAuthenticated);
        };
        let filter = if actor.is_admin() { None } else { Some(user_id) };
        Ok(self.ledger.list_orders(store_id, filter).await?)
    }

    pub async fn get_order_by_id(
        &self,
        store_id: Uuid,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<OrderDetail, CheckoutError> {
        let Some(user_id) = actor.user_id() else {
            return Err(CheckoutError::NotAuthenticated);
        };
        let detail = self
            .ledger
            .find_order(store_id, order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;

        if !actor.is_admin() && detail.order.user_id != Some(user_id) {
            return Err(CheckoutError::NotOrderOwner(order_id));
        }
        Ok(detail)
    }

    pub async fn update_status(
        &self,
        store_id: Uuid,
        actor: &Actor,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, CheckoutError> {
        if !actor.is_store_admin() {
            return Err(CheckoutError::AdminRequired);
        }
        let order = self.ledger.update_status(store_id, order_id, next).await?;
        tracing::info!(order_id = %order_id, status = %next, "Order status updated");
        Ok(order)
    }
}
