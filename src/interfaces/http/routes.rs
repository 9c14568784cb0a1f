use std::future::Future;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::AppState;
use super::dto::{BalanceQuery, BalanceResponse, WithdrawRequest, WithdrawResponse};
use super::errors::{json_error, timeout_response, wallet_error_to_response};
use crate::domain::account::AccountId;
use crate::error::{ErrorKind, WalletError};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn balance(
    State(state): State<AppState>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(query)) = query else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Invalid or missing user_id",
        );
    };

    let account_id = AccountId::from(query.user_id);
    match run_bounded(&state, state.service.balance(account_id)).await {
        Ok(balance) => Json(BalanceResponse {
            user_id: query.user_id,
            balance: balance.value(),
        })
        .into_response(),
        Err(response) => response,
    }
}

pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Invalid request body",
        );
    };

    let account_id = AccountId::from(request.user_id);
    let outcome = run_bounded(&state, state.service.withdraw(account_id, request.amount)).await;
    match outcome {
        Ok(new_balance) => Json(WithdrawResponse {
            status: "success",
            new_balance: new_balance.value(),
        })
        .into_response(),
        Err(response) => response,
    }
}

/// Runs a service call under the configured request timeout.
///
/// On expiry the call's future is dropped, which rolls back any open transaction.
async fn run_bounded<T>(
    state: &AppState,
    call: impl Future<Output = Result<T, WalletError>>,
) -> Result<T, Response> {
    match tokio::time::timeout(state.request_timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            if err.kind() == ErrorKind::Storage {
                error!(error = %err, "storage failure while serving request");
            }
            Err(wallet_error_to_response(err))
        }
        Err(_) => {
            error!(timeout_ms = state.request_timeout.as_millis() as u64, "request timed out");
            Err(timeout_response())
        }
    }
}
