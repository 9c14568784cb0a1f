use super::account::{AccountId, Balance};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence port for account rows.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Opens a transaction. Dropping the returned handle without committing rolls it back.
    async fn begin(&self) -> Result<TransactionBox, StorageError>;

    /// Reads the committed balance without taking any row lock.
    async fn balance(&self, id: AccountId) -> Result<Option<Balance>, StorageError>;

    /// Releases backend resources (connection pools, handles) at shutdown.
    async fn close(&self) {}
}

/// An open unit of work against an [`AccountStore`].
#[async_trait]
pub trait AccountTransaction: Send {
    /// Reads a balance and holds an exclusive lock on the row until the transaction ends.
    ///
    /// Blocks while another transaction holds the same row.
    async fn lock_balance(&mut self, id: AccountId) -> Result<Option<Balance>, StorageError>;

    /// Stages a new balance for a row previously locked by this transaction.
    async fn write_balance(&mut self, id: AccountId, balance: Balance) -> Result<(), StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

pub type SharedAccountStore = Arc<dyn AccountStore>;
pub type TransactionBox = Box<dyn AccountTransaction>;
