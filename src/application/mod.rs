//! Application layer: the wallet façade and the two operations behind it.
//!
//! `WalletService` validates requests and delegates to `BalanceReader` for
//! unlocked reads or to `WithdrawalTransactor` for the locked
//! read-check-write withdrawal protocol.

pub mod reader;
pub mod service;
pub mod transactor;

pub use reader::BalanceReader;
pub use service::WalletService;
pub use transactor::WithdrawalTransactor;
