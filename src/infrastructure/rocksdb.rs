use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::{AccountStore, AccountTransaction, TransactionBox};
use crate::error::StorageError;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Column Family for storing account rows.
pub const CF_ACCOUNTS: &str = "accounts";

/// Process-local row lock table keyed by account.
#[derive(Default)]
struct RowLocks {
    rows: StdMutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl RowLocks {
    fn row(&self, id: AccountId) -> Arc<Mutex<()>> {
        let mut rows = self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rows.entry(id).or_default().clone()
    }
}

/// A persistent account store backed by RocksDB.
///
/// Accounts live JSON-encoded in the `accounts` column family, keyed by the
/// big-endian account id. Exclusive locked reads go through an in-process
/// lock table; RocksDB allows a single process to open the database at a time.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: Arc<RowLocks>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `accounts` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts])?;

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::new(RowLocks::default()),
        })
    }

    /// Provisions (or overwrites) an account row.
    pub fn insert(&self, id: AccountId, balance: Balance) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        put_account(&self.db, &mut batch, &Account::new(id, balance))?;
        self.db.write(batch)?;
        Ok(())
    }
}

fn read_account(db: &DB, id: AccountId) -> Result<Option<Account>, StorageError> {
    let cf = db
        .cf_handle(CF_ACCOUNTS)
        .ok_or_else(|| StorageError::Backend("accounts column family not found".to_string()))?;

    match db.get_cf(cf, id.value().to_be_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn put_account(db: &DB, batch: &mut WriteBatch, account: &Account) -> Result<(), StorageError> {
    let cf = db
        .cf_handle(CF_ACCOUNTS)
        .ok_or_else(|| StorageError::Backend("accounts column family not found".to_string()))?;

    let value = serde_json::to_vec(account)?;
    batch.put_cf(cf, account.id.value().to_be_bytes(), value);
    Ok(())
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn begin(&self) -> Result<TransactionBox, StorageError> {
        Ok(Box::new(RocksDBTransaction {
            db: self.db.clone(),
            locks: self.locks.clone(),
            locked: HashMap::new(),
            staged: HashMap::new(),
        }))
    }

    async fn balance(&self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        Ok(read_account(&self.db, id)?.map(|account| account.balance))
    }
}

struct RocksDBTransaction {
    db: Arc<DB>,
    locks: Arc<RowLocks>,
    locked: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged: HashMap<AccountId, Balance>,
}

#[async_trait]
impl AccountTransaction for RocksDBTransaction {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        if self.locked.contains_key(&id) {
            if let Some(staged) = self.staged.get(&id) {
                return Ok(Some(*staged));
            }
            return Ok(read_account(&self.db, id)?.map(|account| account.balance));
        }

        // Missing accounts are never locked.
        if read_account(&self.db, id)?.is_none() {
            return Ok(None);
        }

        let guard = self.locks.row(id).lock_owned().await;
        let account = read_account(&self.db, id)?;
        if account.is_some() {
            self.locked.insert(id, guard);
        }
        Ok(account.map(|account| account.balance))
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
        let RocksDBTransaction {
            db, locked, staged, ..
        } = *self;

        let mut batch = WriteBatch::default();
        for (id, balance) in staged {
            put_account(&db, &mut batch, &Account::new(id, balance))?;
        }
        db.write(batch)?;

        drop(locked);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }
}
