use thiserror::Error;

use crate::{models::TransactionRecord, query::ListQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to the database: {0}")]
    Connection(String),
    #[error("failed to list transactions: {0}")]
    Query(String),
}

/// A live handle to a transaction store. Dropping it releases the session.
pub trait TransactionStore {
    fn backend_name(&self) -> &'static str;

    /// Fetches every row matching `query`, fully in memory, in store order.
    fn list_transactions(&mut self, query: &ListQuery) -> Result<Vec<TransactionRecord>, StoreError>;
}

/// Opens and validates a handle to a store from explicit configuration.
pub trait Connector {
    fn backend_name(&self) -> &'static str;

    fn connect(&self) -> Result<Box<dyn TransactionStore>, StoreError>;
}
