use crate::domain::account::{Account, AccountId, Balance};
use crate::error::SeedError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AccountRecord {
    id: i64,
    balance: Decimal,
}

/// Reads opening balances (`id,balance`) from a CSV source.
///
/// Used to provision the in-memory and RocksDB stores; the wallet core itself
/// never creates accounts.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    /// Creates a new `AccountReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates account rows.
    pub fn accounts(self) -> impl Iterator<Item = Result<Account, SeedError>> {
        self.reader
            .into_deserialize::<AccountRecord>()
            .map(|result| {
                let record = result?;
                let account = Account::new(AccountId(record.id), Balance::new(record.balance));
                if account.balance.is_negative() {
                    return Err(SeedError::NegativeBalance(account.id));
                }
                Ok(account)
            })
    }
}
