use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::{AccountStore, AccountTransaction, TransactionBox};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

struct Row {
    lock: Arc<Mutex<()>>,
    committed: RwLock<Balance>,
}

type Rows = Arc<RwLock<HashMap<AccountId, Arc<Row>>>>;

/// A thread-safe in-memory account table.
///
/// Every row owns an async mutex standing in for a database row lock: a
/// transaction keeps the owned guard until it commits or is dropped, so
/// concurrent withdrawals against one account queue up in FIFO order while
/// other accounts proceed untouched. Unlocked reads only look at the last
/// committed balance and never wait on the row lock.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    rows: Rows,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions an account row, or overwrites the committed balance of an existing one.
    ///
    /// An existing row keeps its lock, so open transactions still commit into it.
    pub async fn insert(&self, id: AccountId, balance: Balance) {
        let existing = {
            let mut rows = self.rows.write().await;
            match rows.get(&id) {
                Some(row) => Some(row.clone()),
                None => {
                    rows.insert(
                        id,
                        Arc::new(Row {
                            lock: Arc::new(Mutex::new(())),
                            committed: RwLock::new(balance),
                        }),
                    );
                    None
                }
            }
        };
        if let Some(row) = existing {
            *row.committed.write().await = balance;
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn begin(&self) -> Result<TransactionBox, StorageError> {
        Ok(Box::new(InMemoryTransaction {
            rows: self.rows.clone(),
            locked: HashMap::new(),
            staged: HashMap::new(),
        }))
    }

    async fn balance(&self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        let row = self.rows.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(*row.committed.read().await)),
            None => Ok(None),
        }
    }
}

struct InMemoryTransaction {
    rows: Rows,
    locked: HashMap<AccountId, (Arc<Row>, OwnedMutexGuard<()>)>,
    staged: HashMap<AccountId, Balance>,
}

#[async_trait]
impl AccountTransaction for InMemoryTransaction {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        if let Some((row, _)) = self.locked.get(&id) {
            let balance = match self.staged.get(&id) {
                Some(staged) => *staged,
                None => *row.committed.read().await,
            };
            return Ok(Some(balance));
        }

        let Some(row) = self.rows.read().await.get(&id).cloned() else {
            return Ok(None);
        };
        let guard = row.lock.clone().lock_owned().await;
        let balance = *row.committed.read().await;
        self.locked.insert(id, (row, guard));
        Ok(Some(balance))
    }

    async fn write_balance(&mut self, id: AccountId, balance: Balance) -> Result<(), StorageError> {
        if !self.locked.contains_key(&id) {
            return Err(StorageError::Backend(format!(
                "account {id} written without holding its row lock"
            )));
        }
        self.staged.insert(id, balance);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let InMemoryTransaction { locked, staged, .. } = *self;
        for (id, balance) in staged {
            if let Some((row, _)) = locked.get(&id) {
                *row.committed.write().await = balance;
            }
        }
        // Row locks are released only once every staged balance is visible.
        drop(locked);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }
}
