use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::SharedAccountStore;
use crate::error::{Result, WalletError};

/// Unlocked balance lookups. May observe a balance a concurrent withdrawal
/// is about to change; it never sees uncommitted writes.
#[derive(Clone)]
pub struct BalanceReader {
    store: SharedAccountStore,
}

impl BalanceReader {
    pub fn new(store: SharedAccountStore) -> Self {
        Self { store }
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<Balance> {
        self.store
            .balance(account_id)
            .await?
            .ok_or(WalletError::AccountNotFound(account_id))
    }
}
