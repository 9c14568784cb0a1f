use crate::domain::account::{Account, AccountId, Amount, Balance};
use crate::domain::ports::{SharedAccountStore, TransactionBox};
use crate::error::{ErrorKind, Result, WalletError};
use tracing::{error, info, instrument, warn};

/// Runs withdrawals as a single locked read-check-write transaction.
///
/// The row lock taken by [`AccountTransaction::lock_balance`] serializes
/// withdrawals on the same account; different accounts never contend.
///
/// [`AccountTransaction::lock_balance`]: crate::domain::ports::AccountTransaction::lock_balance
#[derive(Clone)]
pub struct WithdrawalTransactor {
    store: SharedAccountStore,
}

impl WithdrawalTransactor {
    pub fn new(store: SharedAccountStore) -> Self {
        Self { store }
    }

    /// Deducts `amount` from the account and returns the committed balance.
    ///
    /// Every exit other than a successful commit rolls the transaction back.
    /// If the returned future is dropped before completion, the open
    /// transaction is dropped with it, which rolls it back as well.
    #[instrument(skip(self), fields(account = %account_id, amount = %amount))]
    pub async fn withdraw(&self, account_id: AccountId, amount: Amount) -> Result<Balance> {
        let mut tx = self.store.begin().await.map_err(|e| {
            error!(error = %e, "failed to begin transaction");
            WalletError::from(e)
        })?;

        let current = match tx.lock_balance(account_id).await {
            Ok(Some(balance)) => balance,
            Ok(None) => return Err(abort(tx, WalletError::AccountNotFound(account_id)).await),
            Err(e) => return Err(abort(tx, e.into()).await),
        };

        let mut account = Account::new(account_id, current);
        let new_balance = match account.withdraw(amount) {
            Ok(balance) => balance,
            Err(e) => return Err(abort(tx, e).await),
        };

        if let Err(e) = tx.write_balance(account_id, new_balance).await {
            return Err(abort(tx, e.into()).await);
        }

        tx.commit().await.map_err(|e| {
            error!(error = %e, "commit failed; balance left unchanged");
            WalletError::from(e)
        })?;

        info!(%new_balance, "withdrawal committed");
        Ok(new_balance)
    }
}

/// Rolls back `tx` and hands `err` back to the caller. A failed rollback is only logged.
async fn abort(tx: TransactionBox, err: WalletError) -> WalletError {
    match err.kind() {
        ErrorKind::Storage => error!(error = %err, "withdrawal failed"),
        _ => warn!(error = %err, "withdrawal rejected"),
    }
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "rollback failed");
    }
    err
}
