//! Account store backends.

pub mod in_memory;
pub mod postgres;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
