use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: i64,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub status: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
}
