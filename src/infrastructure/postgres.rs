//! Postgres-backed account store.
//!
//! Accounts live in the `users` table (`id BIGINT`, `balance NUMERIC`). The
//! exclusive locked read is a `SELECT ... FOR UPDATE`, which makes any other
//! transaction selecting the same row `FOR UPDATE` (or updating it) wait
//! until this one commits or rolls back.
//!
//! ## Transaction cleanup
//!
//! `sqlx::Transaction` issues a rollback when dropped without a commit, so a
//! withdrawal future that is cancelled mid-flight releases its row lock as
//! soon as the connection returns to the pool.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::{AccountStore, AccountTransaction, TransactionBox};
use crate::error::StorageError;
use async_trait::async_trait;

const CONN_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Postgres account store sharing one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool of at most `max_connections` connections and checks the
    /// database is reachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .max_lifetime(CONN_MAX_LIFETIME)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::database("connect", e))?;

        let store = Self::new(pool);
        store.ping().await?;
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::database("acquire", e))?;
        conn.ping()
            .await
            .map_err(|e| StorageError::database("ping", e))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn begin(&self) -> Result<TransactionBox, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::database("begin_transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    #[instrument(skip(self), fields(account = %id), err)]
    async fn balance(&self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        let balance = sqlx::query_scalar::<_, Decimal>("SELECT balance FROM users WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::database("select_balance", e))?;
        Ok(balance.map(Balance::new))
    }

    async fn close(&self) {
        debug!("closing postgres pool");
        self.pool.close().await;
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountTransaction for PostgresTransaction {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| StorageError::database("lock_balance", e))?;
        Ok(balance.map(Balance::new))
    }

    async fn write_balance(&mut self, id: AccountId, balance: Balance) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
            .bind(balance.value())
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StorageError::database("update_balance", e))?;

        if result.rows_affected() != 1 {
            return Err(StorageError::Backend(format!(
                "update of account {id} affected {} rows",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::database("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::database("rollback", e))
    }
}
