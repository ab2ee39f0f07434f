//! PostgreSQL transaction store for bas-balance.

use std::sync::Arc;

use bas_balance_core::{
    Connector, ListQuery, StoreError, TransactionRecord, TransactionStore, Value,
};
use postgres::{
    types::{FromSql, Kind, Type},
    Client, Config, NoTls, Row,
};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub struct PostgresConnector {
    url: String,
}

impl PostgresConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for PostgresConnector {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn connect(&self) -> Result<Box<dyn TransactionStore>, StoreError> {
        let config: Config = self
            .url
            .parse()
            .map_err(|e| StoreError::Connection(format!("invalid connection string: {}", e)))?;

        // Never log the URL itself, it may carry a password
        tracing::debug!(
            hosts = ?config.get_hosts(),
            dbname = config.get_dbname().unwrap_or_default(),
            "connecting to PostgreSQL"
        );

        let mut client = config
            .connect(NoTls)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::debug!("PostgreSQL connection established");
        Ok(Box::new(PostgresStore { client }))
    }
}

pub struct PostgresStore {
    client: Client,
}

impl TransactionStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn list_transactions(&mut self, query: &ListQuery) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = query.to_select()?;
        let statement = self
            .client
            .prepare(&sql)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let columns: Vec<Arc<str>> = statement
            .columns()
            .iter()
            .map(|c| Arc::from(c.name()))
            .collect();
        query.check_columns(&columns)?;

        let rows = self
            .client
            .query(&statement, &[])
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let records = rows
            .iter()
            .map(|row| decode_row(row, &columns))
            .collect::<Result<Vec<_>, _>>()?;

        let records = query.apply(records);
        tracing::debug!(table = %query.table, rows = records.len(), "PostgreSQL query finished");
        Ok(records)
    }
}

type DecodeError = Box<dyn std::error::Error + Sync + Send>;

/// The undecoded wire bytes of any column type.
struct RawValue<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawValue<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(RawValue(raw))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn decode_row(row: &Row, columns: &[Arc<str>]) -> Result<TransactionRecord, StoreError> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let column_err = |e: &dyn std::fmt::Display| StoreError::Query(format!("column {}: {}", name, e));
            let raw = row
                .try_get::<_, Option<RawValue>>(idx)
                .map_err(|e| column_err(&e))?;
            let value = match raw {
                Some(RawValue(bytes)) => {
                    decode_value(row.columns()[idx].type_(), bytes).map_err(|e| column_err(&e))?
                }
                None => Value::Null,
            };
            Ok((name.clone(), value))
        })
        .collect()
}

/// Decodes by base type; domains are decoded as the type they wrap, enums
/// as their label. Anything else shows as `<type-name>`.
fn decode_value(ty: &Type, raw: &[u8]) -> Result<Value, DecodeError> {
    let value = match ty.name() {
        "bool" => Value::Bool(bool::from_sql(ty, raw)?),
        "int2" => Value::Int(i16::from_sql(ty, raw)?.into()),
        "int4" => Value::Int(i32::from_sql(ty, raw)?.into()),
        "int8" => Value::Int(i64::from_sql(ty, raw)?),
        "oid" => Value::Int(u32::from_sql(ty, raw)?.into()),
        "float4" => Value::Float(f32::from_sql(ty, raw)?.into()),
        "float8" => Value::Float(f64::from_sql(ty, raw)?),
        "numeric" => Value::Decimal(Decimal::from_sql(ty, raw)?),
        "text" | "varchar" | "bpchar" | "name" | "unknown" | "citext" => {
            Value::Text(String::from_sql(ty, raw)?)
        }
        "date" => Value::Date(Date::from_sql(ty, raw)?),
        "timestamp" => Value::Timestamp(PrimitiveDateTime::from_sql(ty, raw)?),
        "timestamptz" => Value::TimestampTz(OffsetDateTime::from_sql(ty, raw)?),
        "bytea" => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
        other => match ty.kind() {
            Kind::Domain(inner) => return decode_value(inner, raw),
            Kind::Enum(_) => Value::Text(String::from_utf8_lossy(raw).into_owned()),
            _ => Value::Text(format!("<{}>", other)),
        },
    };
    Ok(value)
}
