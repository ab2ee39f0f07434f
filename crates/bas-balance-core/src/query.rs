use std::fmt::Write;

use crate::{models::TransactionRecord, storage::StoreError};

/// Table listed when nothing else is configured.
pub const DEFAULT_TABLE: &str = "bas_transactions";

/// Largest LIMIT the SQL backends accept (a signed 64-bit integer).
const MAX_SQL_LIMIT: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Equality filter: a row matches when the displayed form of `column`
/// equals `value`, exactly as the listing prints it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// What the transaction reader fetches.
///
/// `ListQuery::all` is the plain "every row" listing. Filters are ANDed,
/// an empty `order_by` leaves ordering to the store and `limit: None`
/// returns every matching row.
///
/// Filters are evaluated on decoded records (`apply`) rather than in SQL,
/// so every backend compares against the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::all(DEFAULT_TABLE)
    }
}

impl ListQuery {
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rejects identifiers that could not be safely interpolated into SQL.
    pub fn validate(&self) -> Result<(), StoreError> {
        let table_ok = match self.table.split_once('.') {
            Some((schema, table)) => is_safe_identifier(schema) && is_safe_identifier(table),
            None => is_safe_identifier(&self.table),
        };
        if !table_ok {
            return Err(StoreError::Query(format!("invalid table name: {:?}", self.table)));
        }

        let columns = self
            .filters
            .iter()
            .map(|f| &f.column)
            .chain(self.order_by.iter().map(|o| &o.column));
        for column in columns {
            if !is_safe_identifier(column) {
                return Err(StoreError::Query(format!("invalid column name: {:?}", column)));
            }
        }
        Ok(())
    }

    /// Builds the SELECT statement for the SQL backends. Ordering is pushed
    /// down; the limit only when there are no filters, since those run
    /// afterwards in `apply`.
    pub fn to_select(&self) -> Result<String, StoreError> {
        self.validate()?;

        let mut sql = format!("SELECT * FROM {}", quote_identifier(&self.table));

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|o| match o.direction {
                    SortDirection::Asc => format!("{} ASC", quote_identifier(&o.column)),
                    SortDirection::Desc => format!("{} DESC", quote_identifier(&o.column)),
                })
                .collect();
            let _ = write!(sql, " ORDER BY {}", terms.join(", "));
        }

        if let (Some(limit), true) = (self.limit, self.filters.is_empty()) {
            let _ = write!(sql, " LIMIT {}", limit.min(MAX_SQL_LIMIT));
        }

        Ok(sql)
    }

    /// Fails when a filter names a column the result set does not have.
    pub fn check_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<(), StoreError> {
        for filter in &self.filters {
            if !columns.iter().any(|c| c.as_ref() == filter.column) {
                return Err(StoreError::Query(format!("no such column: {}", filter.column)));
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.filters.iter().all(|f| match record.get(&f.column) {
            Some(value) if !value.is_null() => value.to_string() == f.value,
            _ => false,
        })
    }

    /// Drops records that fail the filters, then applies the limit.
    /// Order is preserved.
    pub fn apply(&self, mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
        records.retain(|record| self.matches(record));
        if let Some(limit) = self.limit {
            records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        records
    }
}

pub fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quotes an identifier, splitting a `schema.table` qualifier.
/// Callers validate first; quoting alone is not an escape.
fn quote_identifier(s: &str) -> String {
    s.split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join(".")
}
