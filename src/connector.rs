use bas_balance_core::Connector;
use bas_balance_postgres::PostgresConnector;
use bas_balance_sqlite::SqliteConnector;

use crate::config::{Backend, StoreConfig};

/// Picks the connector for the configured backend. Nothing is opened until
/// `Connector::connect` is called.
pub fn connector_for(config: &StoreConfig) -> Box<dyn Connector> {
    match config.backend {
        Backend::Postgres => Box::new(PostgresConnector::new(config.url.clone())),
        Backend::Sqlite => Box::new(SqliteConnector::new(&config.url)),
    }
}
