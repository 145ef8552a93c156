//! Disposable PostgreSQL databases for ledger tests
//!
//! One container is started for the whole test binary. Every [`TestDb`] is a
//! freshly created database inside it with the checkout migrations applied,
//! so tests never see each other's rows.
//!
//! Set `CHECKOUT_TEST_DATABASE_URL` to an existing server's admin URL (ending
//! in `/postgres`) to skip the container.

use checkout_server::ledger::PgLedger;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use testcontainers_modules::testcontainers::{ContainerAsync, runners::AsyncRunner};
use tokio::sync::OnceCell;
use uuid::Uuid;

const USER: &str = "checkout_test";
const PASSWORD: &str = "checkout_test_password";

/// Running container plus the server URL without a database path
struct Server {
    _container: Option<ContainerAsync<PostgresImage>>,
    base_url: String,
}

static SERVER: OnceCell<Server> = OnceCell::const_new();

async fn start_server() -> Server {
    if let Ok(url) = std::env::var("CHECKOUT_TEST_DATABASE_URL") {
        let base_url = url
            .trim_end_matches('/')
            .trim_end_matches("/postgres")
            .to_string();
        return Server {
            _container: None,
            base_url,
        };
    }

    let container = PostgresImage::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name("checkout_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    // Resolved once; later tests run on other runtimes and never touch the docker client
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");
    let host = std::env::var("TESTCONTAINERS_HOST_OVERRIDE")
        .unwrap_or_else(|_| "localhost".to_string());

    Server {
        _container: Some(container),
        base_url: format!("postgresql://{USER}:{PASSWORD}@{host}:{port}"),
    }
}

/// Isolated database, dropped with the container at the end of the run
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
}

impl TestDb {
    pub async fn new() -> Self {
        let server = SERVER.get_or_init(start_server).await;
        // Only [0-9a-f_] after the prefix, so quoting the identifier is enough
        let name = format!("checkout_{}", Uuid::new_v4().simple());

        let mut admin = PgConnection::connect(&format!("{}/postgres", server.base_url))
            .await
            .expect("Failed to connect to postgres database");
        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .await
            .expect("Failed to create test database");
        admin
            .close()
            .await
            .expect("Failed to close admin connection");

        let pool = PgPool::connect(&format!("{}/{name}", server.base_url))
            .await
            .expect("Failed to create pool for database");
        PgLedger::migrate(&pool)
            .await
            .expect("Failed to run migrations on database");

        Self { pool, name }
    }
}
