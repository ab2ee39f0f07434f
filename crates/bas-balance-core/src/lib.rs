//! Core types and traits for bas-balance transaction stores.
//!
//! This crate provides the `Connector` and `TransactionStore` traits and the
//! record model they exchange, so each backend can live in its own crate.

pub mod models;
pub mod query;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{TransactionRecord, Value};
pub use query::{Filter, ListQuery, OrderBy, SortDirection, DEFAULT_TABLE};
pub use storage::{Connector, StoreError, TransactionStore};
