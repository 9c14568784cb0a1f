#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wallet_service::application::WalletService;
use wallet_service::domain::account::{AccountId, Balance};
use wallet_service::domain::ports::{AccountStore, AccountTransaction, TransactionBox};
use wallet_service::error::StorageError;
use wallet_service::infrastructure::in_memory::InMemoryAccountStore;

pub async fn seeded_store(accounts: &[(i64, Decimal)]) -> Arc<InMemoryAccountStore> {
    let store = Arc::new(InMemoryAccountStore::new());
    for (id, balance) in accounts {
        store.insert(AccountId(*id), Balance::new(*balance)).await;
    }
    store
}

pub async fn seeded_service(
    accounts: &[(i64, Decimal)],
) -> (WalletService, Arc<InMemoryAccountStore>) {
    let store = seeded_store(accounts).await;
    (WalletService::new(store.clone()), store)
}

pub async fn committed(store: &InMemoryAccountStore, id: i64) -> Decimal {
    store
        .balance(AccountId(id))
        .await
        .unwrap()
        .expect("account exists")
        .value()
}

/// Where a [`FaultyStore`] injects its failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Begin,
    LockedRead,
    Write,
    Commit,
    /// The write never completes, simulating a hung connection.
    StallOnWrite,
}

/// Wraps the in-memory store, failing at a chosen step and counting calls.
pub struct FaultyStore {
    inner: Arc<InMemoryAccountStore>,
    fault: Fault,
    begins: AtomicUsize,
    reads: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryAccountStore>, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            begins: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of storage round trips (transactions begun plus unlocked reads).
    pub fn calls(&self) -> usize {
        self.begins.load(Ordering::SeqCst) + self.reads.load(Ordering::SeqCst)
    }
}

fn injected(step: &str) -> StorageError {
    StorageError::Backend(format!("injected {step} failure"))
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn begin(&self) -> Result<TransactionBox, StorageError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Begin {
            return Err(injected("begin"));
        }
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }

    async fn balance(&self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.balance(id).await
    }
}

struct FaultyTransaction {
    inner: TransactionBox,
    fault: Fault,
}

#[async_trait]
impl AccountTransaction for FaultyTransaction {
    async fn lock_balance(&mut self, id: AccountId) -> Result<Option<Balance>, StorageError> {
        if self.fault == Fault::LockedRead {
            return Err(injected("locked read"));
        }
        self.inner.lock_balance(id).await
    }

    async fn write_balance(&mut self, id: AccountId, balance: Balance) -> Result<(), StorageError> {
        match self.fault {
            Fault::Write => Err(injected("write")),
            Fault::StallOnWrite => std::future::pending().await,
            _ => self.inner.write_balance(id, balance).await,
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        if self.fault == Fault::Commit {
            // The inner transaction is dropped uncommitted.
            return Err(injected("commit"));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.inner.rollback().await
    }
}
