//! SQLite transaction store for bas-balance.
//!
//! Databases are opened read-only and never created; `:memory:` opens an
//! empty in-memory database.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use bas_balance_core::{
    Connector, ListQuery, StoreError, TransactionRecord, TransactionStore, Value,
};
use rusqlite::{types::ValueRef, Connection, OpenFlags};

pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Connector for SqliteConnector {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self) -> Result<Box<dyn TransactionStore>, StoreError> {
        let conn = if self.path == Path::new(":memory:") {
            Connection::open_in_memory()
        } else {
            if !self.path.exists() {
                return Err(StoreError::Connection(format!(
                    "database not found at {}",
                    self.path.display()
                )));
            }
            Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), "SQLite database opened");
        Ok(Box::new(SqliteStore { conn }))
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl TransactionStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn list_transactions(&mut self, query: &ListQuery) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = query.to_select()?;
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let columns: Vec<Arc<str>> = stmt.column_names().into_iter().map(Arc::from).collect();
        query.check_columns(&columns)?;

        let mut rows = stmt
            .query([])
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| StoreError::Query(e.to_string()))? {
            let mut fields = Vec::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                let value = match row.get_ref(idx).map_err(|e| StoreError::Query(e.to_string()))? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(i) => Value::Int(i),
                    ValueRef::Real(f) => Value::Float(f),
                    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                };
                fields.push((name.clone(), value));
            }
            records.push(TransactionRecord::new(fields));
        }

        let records = query.apply(records);
        tracing::debug!(table = %query.table, rows = records.len(), "SQLite query finished");
        Ok(records)
    }
}
