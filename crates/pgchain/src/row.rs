//! Result records and row mapping.

use crate::error::{ChainError, ChainResult};
use crate::value::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// One result row: column names mapped to [`Value`]s, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name shadows nothing: [`Record::get`] returns the first.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Like [`Record::get`], but a missing column is a decode error.
    pub fn try_get_column(&self, column: &str) -> ChainResult<&Value> {
        self.get(column)
            .ok_or_else(|| ChainError::decode(column, "column not present in result"))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.push(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Trait for converting a [`Record`] into a Rust struct.
///
/// # Example
///
/// ```ignore
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRecord for User {
///     fn from_record(r: &Record) -> ChainResult<Self> {
///         Ok(Self {
///             id: r.try_get_column("id")?.as_i64().unwrap_or_default(),
///             name: r.try_get_column("name")?.to_string(),
///         })
///     }
/// }
/// ```
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> ChainResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> ChainResult<Self> {
        Ok(record.clone())
    }
}

/// Convert a driver row into a [`Record`].
pub fn record_from_row(row: &Row) -> ChainResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.name(), column.type_())?;
        record.push(column.name(), value);
    }
    Ok(record)
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> ChainResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| ChainError::decode(name, e.to_string()))
}

fn decode_column(row: &Row, idx: usize, name: &str, ty: &Type) -> ChainResult<Value> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx, name)?.into(),
        Type::INT2 => get::<i16>(row, idx, name)?.into(),
        Type::INT4 => get::<i32>(row, idx, name)?.into(),
        Type::INT8 => get::<i64>(row, idx, name)?.into(),
        Type::OID => get::<u32>(row, idx, name)?.into(),
        Type::FLOAT4 => get::<f32>(row, idx, name)?.into(),
        Type::FLOAT8 => get::<f64>(row, idx, name)?.into(),
        Type::NUMERIC => get::<Decimal>(row, idx, name)?.map_or(Value::Null, decimal_value),
        Type::DATE => text(get::<chrono::NaiveDate>(row, idx, name)?),
        Type::TIME => text(get::<chrono::NaiveTime>(row, idx, name)?),
        Type::TIMESTAMP => text(get::<chrono::NaiveDateTime>(row, idx, name)?),
        Type::TIMESTAMPTZ => get::<chrono::DateTime<chrono::Utc>>(row, idx, name)?
            .map_or(Value::Null, |ts| Value::Text(ts.to_rfc3339())),
        Type::UUID => text(get::<uuid::Uuid>(row, idx, name)?),
        Type::JSON | Type::JSONB => text(get::<serde_json::Value>(row, idx, name)?),
        _ if <String as FromSql>::accepts(ty) => get::<String>(row, idx, name)?.into(),
        _ => {
            return Err(ChainError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        }
    };
    Ok(value)
}

fn text<T: ToString>(value: Option<T>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

/// Whole numerics (e.g. `SUM(bigint)`) become integers, everything else a float.
fn decimal_value(d: Decimal) -> Value {
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Value::Int(i);
        }
    }
    d.to_f64()
        .map_or_else(|| Value::Text(d.to_string()), Value::Real)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lookup_and_order() {
        let record: Record = [("id", Value::Int(1)), ("name", Value::from("Ann"))]
            .into_iter()
            .collect();
        assert_eq!(record.columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(record.get("name"), Some(&Value::Text("Ann".into())));
        assert!(record.get("missing").is_none());
        assert!(matches!(
            record.try_get_column("missing"),
            Err(ChainError::Decode { .. })
        ));
    }

    #[test]
    fn record_serializes_as_ordered_map() {
        let mut record = Record::new();
        record.push("name", "Ann");
        record.push("age", 30);
        record.push("email", Value::Null);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"Ann","age":30,"email":null}"#
        );
    }

    #[test]
    fn decimal_mapping() {
        assert_eq!(decimal_value(Decimal::from(42)), Value::Int(42));
        assert_eq!(decimal_value(Decimal::new(255, 1)), Value::Real(25.5));
    }
}
