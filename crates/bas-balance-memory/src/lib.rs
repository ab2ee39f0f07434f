//! In-memory transaction store for bas-balance.
//!
//! Tables are plain vectors of records. Filtering, ordering and limits follow
//! the SQL backends so the store can stand in for them in tests.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use bas_balance_core::{
    Connector, ListQuery, SortDirection, StoreError, TransactionRecord, TransactionStore, Value,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<Arc<str>, Vec<TransactionRecord>>,
    queries: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, records: Vec<TransactionRecord>) -> Self {
        self.tables.insert(Arc::from(name), records);
        self
    }

    pub fn create_table(&mut self, name: &str) {
        self.tables.entry(Arc::from(name)).or_default();
    }

    pub fn insert(&mut self, table: &str, record: TransactionRecord) {
        self.tables.entry(Arc::from(table)).or_default().push(record);
    }

    /// Number of `list_transactions` calls served by this store and its clones.
    pub fn queries_served(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

impl TransactionStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn list_transactions(&mut self, query: &ListQuery) -> Result<Vec<TransactionRecord>, StoreError> {
        query.validate()?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        let rows = self
            .tables
            .get(query.table.as_str())
            .ok_or_else(|| StoreError::Query(format!("no such table: {}", query.table)))?;

        if let Some(first) = rows.first() {
            let referenced = query
                .filters
                .iter()
                .map(|f| &f.column)
                .chain(query.order_by.iter().map(|o| &o.column));
            for column in referenced {
                if first.get(column).is_none() {
                    return Err(StoreError::Query(format!("no such column: {}", column)));
                }
            }
        }

        let mut records = rows.clone();
        if !query.order_by.is_empty() {
            records.sort_by(|a, b| {
                for order in &query.order_by {
                    let ord = compare_values(
                        a.get(&order.column).unwrap_or(&Value::Null),
                        b.get(&order.column).unwrap_or(&Value::Null),
                    );
                    let ord = match order.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != CmpOrdering::Equal {
                        return ord;
                    }
                }
                CmpOrdering::Equal
            });
        }

        let records = query.apply(records);
        tracing::debug!(table = %query.table, rows = records.len(), "memory query finished");
        Ok(records)
    }
}

/// Nulls sort first, numbers compare numerically across representations,
/// anything else of mismatched type falls back to its text form.
fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Null, Value::Null) => CmpOrdering::Equal,
        (Value::Null, _) => CmpOrdering::Less,
        (_, Value::Null) => CmpOrdering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Int(x), Value::Decimal(y)) => Decimal::from(*x).cmp(y),
        (Value::Decimal(x), Value::Int(y)) => x.cmp(&Decimal::from(*y)),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::Decimal(x), Value::Float(y)) => x.to_f64().unwrap_or(f64::NAN).total_cmp(y),
        (Value::Float(x), Value::Decimal(y)) => x.total_cmp(&y.to_f64().unwrap_or(f64::NAN)),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::TimestampTz(x), Value::TimestampTz(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Hands out clones of one `MemoryStore`, or refuses every connection.
pub struct MemoryConnector {
    store: MemoryStore,
    unreachable: Option<String>,
    connections: AtomicU64,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            unreachable: None,
            connections: AtomicU64::new(0),
        }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            store: MemoryStore::new(),
            unreachable: Some(reason.into()),
            connections: AtomicU64::new(0),
        }
    }

    pub fn connections_opened(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn queries_served(&self) -> u64 {
        self.store.queries_served()
    }
}

impl Connector for MemoryConnector {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn connect(&self) -> Result<Box<dyn TransactionStore>, StoreError> {
        if let Some(reason) = &self.unreachable {
            return Err(StoreError::Connection(reason.clone()));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.store.clone()))
    }
}
