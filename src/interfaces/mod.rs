//! Adapters facing the outside world: HTTP routes and CSV account loading.

pub mod csv;
pub mod http;
