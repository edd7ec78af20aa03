//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, plus the Postgres
//! implementations of [`ItemStore`] and [`UserStore`].
//!
//! Name uniqueness is enforced by unique indexes; a violation (SQLSTATE
//! 23505) is reported as `StorageError::Conflict`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use secrecy::{ExposeSecret, SecretString};
use stockroom_core::{Item, ItemFields, ItemId, NewUser, StorageError, User, UserId};
use stockroom_storage::{ItemStore, UserStore};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: SecretString,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait timeout when the pool is exhausted
    pub timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "stockroom".to_string(),
            user: "postgres".to_string(),
            password: SecretString::new(String::new().into()),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("STOCKROOM_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("STOCKROOM_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("STOCKROOM_DB_NAME").unwrap_or_else(|_| "stockroom".to_string()),
            user: std::env::var("STOCKROOM_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: SecretString::new(
                std::env::var("STOCKROOM_DB_PASSWORD")
                    .unwrap_or_default()
                    .into(),
            ),
            max_size: std::env::var("STOCKROOM_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("STOCKROOM_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.expose_secret().to_string());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id          BIGSERIAL PRIMARY KEY,
    name        VARCHAR(255) NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    quantity    BIGINT NOT NULL DEFAULT 0 CHECK (quantity >= 0),
    price       BIGINT NOT NULL DEFAULT 0 CHECK (price >= 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    username      VARCHAR(150) NOT NULL UNIQUE,
    email         VARCHAR(254) NOT NULL DEFAULT '',
    first_name    VARCHAR(150) NOT NULL DEFAULT '',
    last_name     VARCHAR(150) NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    date_joined   TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

const ITEM_COLUMNS: &str = "id, name, description, quantity, price, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, date_joined";

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Shared handle to the connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> Result<deadpool_postgres::Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the `items` and `users` tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(backend_error)?;
        tracing::info!("Database schema ensured");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1").await.map_err(backend_error)?;
        Ok(())
    }
}

fn pool_error(err: PoolError) -> StorageError {
    match err {
        PoolError::Timeout(_) => StorageError::PoolExhausted,
        other => StorageError::Backend {
            reason: other.to_string(),
        },
    }
}

fn backend_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);
    StorageError::Backend {
        reason: err.to_string(),
    }
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn item_from_row(row: &Row) -> Result<Item, StorageError> {
    Ok(Item {
        id: ItemId(row.try_get("id").map_err(backend_error)?),
        name: row.try_get("name").map_err(backend_error)?,
        description: row.try_get("description").map_err(backend_error)?,
        quantity: row.try_get("quantity").map_err(backend_error)?,
        price: row.try_get("price").map_err(backend_error)?,
        created_at: row.try_get("created_at").map_err(backend_error)?,
        updated_at: row.try_get("updated_at").map_err(backend_error)?,
    })
}

fn user_from_row(row: &Row) -> Result<User, StorageError> {
    Ok(User {
        id: UserId(row.try_get("id").map_err(backend_error)?),
        username: row.try_get("username").map_err(backend_error)?,
        email: row.try_get("email").map_err(backend_error)?,
        first_name: row.try_get("first_name").map_err(backend_error)?,
        last_name: row.try_get("last_name").map_err(backend_error)?,
        password_hash: row.try_get("password_hash").map_err(backend_error)?,
        date_joined: row.try_get("date_joined").map_err(backend_error)?,
    })
}

// ============================================================================
// ITEM STORE
// ============================================================================

/// Postgres-backed item table.
#[derive(Clone)]
pub struct PgItemStore {
    db: DbClient,
}

impl PgItemStore {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn insert(&self, fields: ItemFields) -> Result<Item, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!(
            "INSERT INTO items (name, description, quantity, price) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ITEM_COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[&fields.name, &fields.description, &fields.quantity, &fields.price],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::duplicate_item_name(&fields.name)
                } else {
                    backend_error(e)
                }
            })?;
        item_from_row(&row)
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id.as_i64()])
            .await
            .map_err(backend_error)?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn replace(&self, id: ItemId, fields: ItemFields) -> Result<Item, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!(
            "UPDATE items SET name = $2, description = $3, quantity = $4, price = $5, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            ITEM_COLUMNS
        );
        let row = conn
            .query_opt(
                sql.as_str(),
                &[
                    &id.as_i64(),
                    &fields.name,
                    &fields.description,
                    &fields.quantity,
                    &fields.price,
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::duplicate_item_name(&fields.name)
                } else {
                    backend_error(e)
                }
            })?;

        match row {
            Some(row) => item_from_row(&row),
            None => Err(StorageError::item_not_found(id)),
        }
    }

    async fn delete(&self, id: ItemId) -> Result<(), StorageError> {
        let conn = self.db.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM items WHERE id = $1", &[&id.as_i64()])
            .await
            .map_err(backend_error)?;
        if deleted == 0 {
            return Err(StorageError::item_not_found(id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Item>, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!("SELECT {} FROM items ORDER BY id", ITEM_COLUMNS);
        let rows = conn.query(sql.as_str(), &[]).await.map_err(backend_error)?;
        rows.iter().map(item_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.db.ping().await
    }
}

// ============================================================================
// USER STORE
// ============================================================================

/// Postgres-backed user accounts.
#[derive(Clone)]
pub struct PgUserStore {
    db: DbClient,
}

impl PgUserStore {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &user.username,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                    &user.password_hash,
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::duplicate_username(&user.username)
                } else {
                    backend_error(e)
                }
            })?;
        user_from_row(&row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&username])
            .await
            .map_err(backend_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let conn = self.db.get_conn().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id.0])
            .await
            .map_err(backend_error)?;
        row.as_ref().map(user_from_row).transpose()
    }
}
