use std::{fmt::Display, sync::Arc};

use rust_decimal::Decimal;
use serde::{ser::SerializeMap, Serialize, Serializer};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// A single column value, decoded from the store's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(Date),
    Timestamp(PrimitiveDateTime),
    TimestampTz(OffsetDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

fn date_to_str(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
}

fn time_to_str(t: Time) -> String {
    let mut s = format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second());
    if t.microsecond() != 0 {
        s.push_str(&format!(".{:06}", t.microsecond()));
    }
    s
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("<nil>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => f.write_str(&date_to_str(*d)),
            Value::Timestamp(ts) => {
                write!(f, "{} {}", date_to_str(ts.date()), time_to_str(ts.time()))
            }
            Value::TimestampTz(ts) => {
                let offset = ts.offset();
                let (hours, minutes, _) = offset.as_hms();
                let sign = if offset.is_negative() { '-' } else { '+' };
                write!(
                    f,
                    "{} {} {}{:02}:{:02}",
                    date_to_str(ts.date()),
                    time_to_str(ts.time()),
                    sign,
                    hours.unsigned_abs(),
                    minutes.unsigned_abs()
                )
            }
            Value::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            // decimals, dates and bytes as their display text
            _ => serializer.collect_str(self),
        }
    }
}

/// One row of the transactions table.
///
/// Columns keep the order the store returned them in. Column names are
/// shared between all records of one query result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionRecord {
    columns: Vec<(Arc<str>, Value)>,
}

impl TransactionRecord {
    pub fn new(columns: Vec<(Arc<str>, Value)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[(Arc<str>, Value)] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column.as_ref() == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(Arc<str>, Value)> for TransactionRecord {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Display for TransactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", name, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for TransactionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name.as_ref(), value)?;
        }
        map.end()
    }
}
