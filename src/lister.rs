use std::io::Write;

use bas_balance_core::{Connector, ListQuery, StoreError};
use thiserror::Error;

use crate::{
    config::ConfigError,
    render::{RenderError, Renderer},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Connects, lists every transaction matching `query` and renders them to
/// `out`. Returns the number of records written.
///
/// All rows are fetched before the first line is written, so a failed query
/// leaves `out` untouched. The closing line is only written on success.
pub fn run(
    connector: &dyn Connector,
    query: &ListQuery,
    renderer: &Renderer,
    out: &mut dyn Write,
) -> Result<usize, AppError> {
    let mut store = connector.connect()?;
    tracing::debug!(backend = store.backend_name(), "connected to transaction store");

    let records = store.list_transactions(query)?;
    tracing::info!(table = %query.table, count = records.len(), "fetched transactions");

    renderer.render(&records, out)?;
    Ok(records.len())
}
