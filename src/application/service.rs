use super::reader::BalanceReader;
use super::transactor::WithdrawalTransactor;
use crate::domain::account::{AccountId, Amount, Balance};
use crate::domain::ports::SharedAccountStore;
use crate::error::Result;
use rust_decimal::Decimal;

/// Entry point used by the transport layer.
///
/// Rejects malformed requests before any storage I/O and otherwise hands
/// off to the reader or the transactor, returning their outcome unchanged.
#[derive(Clone)]
pub struct WalletService {
    reader: BalanceReader,
    transactor: WithdrawalTransactor,
}

impl WalletService {
    pub fn new(store: SharedAccountStore) -> Self {
        Self {
            reader: BalanceReader::new(store.clone()),
            transactor: WithdrawalTransactor::new(store),
        }
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<Balance> {
        self.reader.balance(account_id).await
    }

    /// Withdraws `amount`, which must be strictly positive (zero is rejected too).
    pub async fn withdraw(&self, account_id: AccountId, amount: Decimal) -> Result<Balance> {
        let amount = Amount::new(amount)?;
        self.transactor.withdraw(account_id, amount).await
    }
}
