#![allow(dead_code, unused_macros)]

pub mod db;
pub mod memory_ledger;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use checkout_server::auth::{Actor, Role};
use checkout_server::cart::{CartStore, MokaCartStore};
use checkout_server::ledger::{Ledger, PgLedger};
use checkout_server::notify::{NotificationQueue, Notifier, NotifyError, OrderConfirmation};
use checkout_server::payment::{
    PaymentError, PaymentGateway, PaymentIntent, PaymentMetadata, VerifiedTransaction,
    sign_payload, verify_signature,
};
use checkout_server::{AppState, Components};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use shared::models::{
    Address, AddressInput, CartEntry, CartItemKey, CreateOrderRequest, NewAddress, Order,
};
use shared::util::now_millis;
use sqlx::PgPool;
use uuid::Uuid;

use self::db::TestDb;
use self::memory_ledger::MemoryLedger;

pub const WEBHOOK_SECRET: &[u8] = b"sk_test_webhook";
pub const JWT_SECRET: &str = "jwt-test-secret";
pub const PLACEHOLDER_EMAIL: &str = "guest@example.com";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Recorded `initialize` call
#[derive(Debug, Clone)]
pub struct InitializeCall {
    pub email: String,
    pub amount: Decimal,
    pub metadata: PaymentMetadata,
}

/// Gateway double: deterministic references, switchable failure, scripted verify results
#[derive(Default)]
pub struct ScriptedGateway {
    fail: AtomicBool,
    initialized: AtomicUsize,
    calls: Mutex<Vec<InitializeCall>>,
    transactions: Mutex<HashMap<String, VerifiedTransaction>>,
}

impl ScriptedGateway {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<InitializeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn script_transaction(&self, transaction: VerifiedTransaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(transaction.reference.clone(), transaction);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        email: &str,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected {
                status: 503,
                message: "gateway unavailable".into(),
            });
        }
        let n = self.initialized.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(InitializeCall {
            email: email.to_string(),
            amount,
            metadata: metadata.clone(),
        });
        let reference = format!("ref_{n}_{}", metadata.order_id.simple());
        Ok(PaymentIntent {
            authorization_url: format!("https://checkout.test/{reference}"),
            access_code: Some(format!("ac_{n}")),
            reference,
        })
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, PaymentError> {
        self.transactions
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| PaymentError::Rejected {
                status: 404,
                message: "Transaction reference not found".into(),
            })
    }

    fn verify_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        verify_signature(WEBHOOK_SECRET, signature, raw_body)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OrderConfirmation>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OrderConfirmation> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until at least `n` messages arrived (or give up after ~2s)
    pub async fn wait_for(&self, n: usize) -> Vec<OrderConfirmation> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= n {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_order_confirmation(&self, message: &OrderConfirmation) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Expands each scenario `async fn name(h: Harness)` into one test per ledger backend
macro_rules! ledger_suite {
    ($( #[$attr:meta] $name:ident ),* $(,)?) => {
        mod memory {
            $(
                #[$attr]
                async fn $name() {
                    super::$name(super::Harness::new().await).await;
                }
            )*
        }

        mod postgres {
            $(
                #[$attr]
                async fn $name() {
                    super::$name(super::Harness::postgres().await).await;
                }
            )*
        }
    };
}

/// Direct access to whichever backend a [`Harness`] runs on, for seeding and inspection
pub enum LedgerFixture {
    Memory(MemoryLedger),
    Postgres(TestDb),
}

impl LedgerFixture {
    pub async fn add_store(&self, store_id: Uuid) {
        match self {
            Self::Memory(ledger) => ledger.add_store(store_id).await,
            Self::Postgres(db) => {
                sqlx::query("INSERT INTO stores (id, name, created_at) VALUES ($1, $2, $3)")
                    .bind(store_id)
                    .bind("Test store")
                    .bind(now_millis())
                    .execute(&db.pool)
                    .await
                    .unwrap();
            }
        }
    }

    pub async fn add_product(&self, store_id: Uuid, product_id: Uuid, base_price: Decimal, stock: i32) {
        match self {
            Self::Memory(ledger) => ledger.add_product(store_id, product_id, base_price, stock).await,
            Self::Postgres(db) => {
                sqlx::query(
                    "INSERT INTO products (id, store_id, name, base_price, stock_quantity, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(product_id)
                .bind(store_id)
                .bind("Test product")
                .bind(base_price)
                .bind(stock)
                .bind(now_millis())
                .execute(&db.pool)
                .await
                .unwrap();
            }
        }
    }

    pub async fn add_variant(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
        specific_price: Option<Decimal>,
        stock: i32,
    ) {
        match self {
            Self::Memory(ledger) => {
                ledger
                    .add_variant(product_id, variant_id, specific_price, stock)
                    .await
            }
            Self::Postgres(db) => {
                sqlx::query(
                    "INSERT INTO product_variants (id, product_id, name, specific_price, stock_quantity, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(variant_id)
                .bind(product_id)
                .bind("Test variant")
                .bind(specific_price)
                .bind(stock)
                .bind(now_millis())
                .execute(&db.pool)
                .await
                .unwrap();
            }
        }
    }

    pub async fn add_address(&self, address: Address) {
        match self {
            Self::Memory(ledger) => ledger.add_address(address).await,
            Self::Postgres(db) => {
                sqlx::query(
                    "INSERT INTO addresses (id, user_id, street, city, state, zip_code, country, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(address.id)
                .bind(address.user_id)
                .bind(&address.street)
                .bind(&address.city)
                .bind(&address.state)
                .bind(&address.zip_code)
                .bind(&address.country)
                .bind(now_millis())
                .execute(&db.pool)
                .await
                .unwrap();
            }
        }
    }

    /// Catalog price change, as an administrator would make it
    pub async fn set_price(&self, unit: CartItemKey, price: Decimal) {
        match self {
            Self::Memory(ledger) => ledger.set_price(unit, price).await,
            Self::Postgres(db) => {
                let query = match unit.variant_id {
                    Some(variant_id) => {
                        sqlx::query("UPDATE product_variants SET specific_price = $1 WHERE id = $2")
                            .bind(price)
                            .bind(variant_id)
                    }
                    None => sqlx::query("UPDATE products SET base_price = $1 WHERE id = $2")
                        .bind(price)
                        .bind(unit.product_id),
                };
                query.execute(&db.pool).await.unwrap();
            }
        }
    }

    pub async fn stock_of(&self, unit: CartItemKey) -> Option<i32> {
        match self {
            Self::Memory(ledger) => ledger.stock_of(unit).await,
            Self::Postgres(db) => {
                let query = match unit.variant_id {
                    Some(variant_id) => {
                        sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM product_variants WHERE id = $1")
                            .bind(variant_id)
                    }
                    None => sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE id = $1")
                        .bind(unit.product_id),
                };
                query.fetch_optional(&db.pool).await.unwrap()
            }
        }
    }

    pub async fn order_count(&self) -> usize {
        match self {
            Self::Memory(ledger) => ledger.order_count().await,
            Self::Postgres(db) => count_rows(&db.pool, "orders").await,
        }
    }

    pub async fn item_count(&self) -> usize {
        match self {
            Self::Memory(ledger) => ledger.item_count().await,
            Self::Postgres(db) => count_rows(&db.pool, "order_items").await,
        }
    }

    pub async fn address_count(&self) -> usize {
        match self {
            Self::Memory(ledger) => ledger.address_count().await,
            Self::Postgres(db) => count_rows(&db.pool, "addresses").await,
        }
    }
}

async fn count_rows(pool: &PgPool, table: &str) -> usize {
    let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    usize::try_from(n).unwrap()
}

/// Seeded store: product P1 (base 8.00, stock 4) with variant V1 (10.00, stock 5)
pub struct Harness {
    pub ledger: LedgerFixture,
    pub carts: Arc<MokaCartStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
    pub store_id: Uuid,
    pub product: CartItemKey,
    pub variant: CartItemKey,
}

impl Harness {
    /// Harness over the in-memory ledger
    pub async fn new() -> Self {
        let ledger = MemoryLedger::new();
        let backend: Arc<dyn Ledger> = Arc::new(ledger.clone());
        Self::seeded(LedgerFixture::Memory(ledger), backend).await
    }

    /// Harness over [`PgLedger`] in a fresh database
    pub async fn postgres() -> Self {
        let db = TestDb::new().await;
        let backend: Arc<dyn Ledger> = Arc::new(PgLedger::new(db.pool.clone()));
        Self::seeded(LedgerFixture::Postgres(db), backend).await
    }

    /// Harness whose application state runs on `backend`, with no seeded catalog
    pub fn with_ledger(backend: Arc<dyn Ledger>) -> Self {
        Self::assemble(LedgerFixture::Memory(MemoryLedger::new()), backend, Uuid::new_v4())
    }

    async fn seeded(fixture: LedgerFixture, backend: Arc<dyn Ledger>) -> Self {
        let store_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();
        fixture.add_store(store_id).await;
        fixture
            .add_product(store_id, product_id, dec("8.00"), 4)
            .await;
        fixture
            .add_variant(product_id, variant_id, Some(dec("10.00")), 5)
            .await;

        let mut h = Self::assemble(fixture, backend, store_id);
        h.product = CartItemKey::new(product_id, None);
        h.variant = CartItemKey::new(product_id, Some(variant_id));
        h
    }

    fn assemble(fixture: LedgerFixture, backend: Arc<dyn Ledger>, store_id: Uuid) -> Self {
        let carts = Arc::new(MokaCartStore::new(Duration::from_secs(3600), 1_000));
        let gateway = Arc::new(ScriptedGateway::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let (notifications, _worker) =
            NotificationQueue::spawn(notifier.clone(), 64, 3, Duration::from_millis(1));

        let state = AppState::from_components(Components {
            ledger: backend,
            carts: carts.clone(),
            gateway: gateway.clone(),
            notifications,
            jwt_secret: SecretString::from(JWT_SECRET.to_string()),
            guest_email_placeholder: PLACEHOLDER_EMAIL.to_string(),
        });

        Self {
            ledger: fixture,
            carts,
            gateway,
            notifier,
            state,
            store_id,
            product: CartItemKey::new(Uuid::nil(), None),
            variant: CartItemKey::new(Uuid::nil(), None),
        }
    }

    /// Order header as the application state's ledger sees it
    pub async fn order(&self, order_id: Uuid) -> Option<Order> {
        self.state
            .ledger
            .find_order(self.store_id, order_id)
            .await
            .unwrap()
            .map(|detail| detail.order)
    }

    pub async fn add_to_cart(&self, actor: &Actor, unit: CartItemKey, quantity: u32) {
        self.carts
            .add(
                self.store_id,
                &actor.cart_owner(),
                CartEntry {
                    product_id: unit.product_id,
                    variant_id: unit.variant_id,
                    quantity,
                },
            )
            .await
            .unwrap();
    }

    pub async fn cart_of(&self, actor: &Actor) -> Vec<CartEntry> {
        self.carts
            .read(self.store_id, &actor.cart_owner())
            .await
            .unwrap()
    }
}

pub fn guest(session: &str) -> Actor {
    Actor::Guest {
        session_id: session.to_string(),
    }
}

pub fn customer(user_id: Uuid, role: Role) -> Actor {
    Actor::Customer {
        user_id,
        email: format!("{}@example.com", user_id.simple()),
        role,
    }
}

pub fn inline_address() -> AddressInput {
    AddressInput::New(NewAddress {
        street: "1 Marina Road".into(),
        city: "Lagos".into(),
        state: "Lagos".into(),
        zip_code: "101001".into(),
        country: "NG".into(),
    })
}

pub fn checkout_request(email: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
        address: inline_address(),
        email: email.map(str::to_string),
    }
}

/// `charge.success` payload and its signature
pub fn charge_success(
    reference: &str,
    amount_minor: i64,
    order_id: Option<Uuid>,
    store_id: Uuid,
) -> (Vec<u8>, String) {
    let metadata = match order_id {
        Some(order_id) => json!({ "orderId": order_id, "tenantId": store_id }),
        None => json!(""),
    };
    let body = serde_json::to_vec(&json!({
        "event": "charge.success",
        "data": {
            "id": 302961,
            "status": "success",
            "reference": reference,
            "amount": amount_minor,
            "currency": "NGN",
            "metadata": metadata,
            "customer": { "email": "payer@example.com" }
        }
    }))
    .unwrap();
    let signature = sign_payload(WEBHOOK_SECRET, &body);
    (body, signature)
}
