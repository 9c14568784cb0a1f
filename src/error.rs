use crate::domain::account::{AccountId, Amount, Balance};
use thiserror::Error;

/// Failures raised by the wallet core.
///
/// The set is closed: callers branch on the variant (or on [`ErrorKind`]),
/// never on the rendered message.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Balance,
        requested: Amount,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Fieldless view of [`WalletError`], handy for matching at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAmount,
    AccountNotFound,
    InsufficientFunds,
    Storage,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidAmount => ErrorKind::InvalidAmount,
            WalletError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            WalletError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            WalletError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether resubmitting the exact same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Storage(_))
    }
}

/// Faults coming out of an account store backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{operation} failed: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

impl StorageError {
    pub fn database(operation: &'static str, source: sqlx::Error) -> Self {
        StorageError::Database { operation, source }
    }
}

/// Errors raised while loading opening balances from CSV.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("account {0} has a negative opening balance")]
    NegativeBalance(AccountId),
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;
