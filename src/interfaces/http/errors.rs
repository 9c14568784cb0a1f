use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::WalletError;

pub fn wallet_error_to_response(err: WalletError) -> Response {
    match err {
        WalletError::InvalidAmount => {
            json_error(StatusCode::BAD_REQUEST, "invalid_amount", err.to_string())
        }
        WalletError::InsufficientFunds { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_funds", "Insufficient funds")
        }
        WalletError::AccountNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "account_not_found", "User not found")
        }
        // Storage details stay in the logs.
        WalletError::Storage(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        ),
    }
}

pub fn timeout_response() -> Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "timeout",
        "Request timed out; the outcome is unknown, re-check the balance before retrying",
    )
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
