//! HTTP transport: JSON routes over the wallet service.

pub mod dto;
pub mod errors;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};

use crate::application::WalletService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WalletService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: WalletService, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/balance", get(routes::balance))
        .route("/withdraw", post(routes::withdraw))
        .with_state(state)
}
