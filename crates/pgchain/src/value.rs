//! Dynamically typed values flowing through conditions, bindings and result rows.

use crate::sanitize::sanitize;
use bytes::BytesMut;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn StdError + Sync + Send>;

/// A single SQL value.
///
/// Values are bound by name and converted to whatever PostgreSQL type the server inferred
/// for the placeholder, so `Value::Text("18")` can be compared against an `integer` column
/// and `Value::Int(5)` can be written into a `text` column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Classify a raw literal taken from a condition string.
    ///
    /// - `'quoted'` / `"quoted"` => text without the quotes
    /// - `null` (case-insensitive) => [`Value::Null`]
    /// - anything else => [`Value::Text`], exactly as written
    ///
    /// Literals are not evaluated: `02134`, `+15551234` and `1.50` keep their spelling and
    /// are converted to the placeholder's inferred type when bound.
    pub fn from_literal(raw: &str) -> Self {
        let raw = raw.trim();
        for quote in ['\'', '"'] {
            if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
                return Value::Text(raw[1..raw.len() - 1].to_string());
            }
        }
        if raw.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        Value::Text(raw.to_string())
    }

    /// Apply [`sanitize`] to text; every other variant passes through unchanged.
    pub fn sanitized(&self) -> Value {
        match self {
            Value::Text(s) => Value::Text(sanitize(s)),
            other => other.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value (integers widen to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn is_text(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {value:?} to a parameter of type {ty}").into()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if is_text(ty) {
        return s.to_sql(ty, out);
    }
    let s = s.trim();
    match *ty {
        Type::BOOL => parse_bool(s)
            .ok_or_else(|| format!("invalid boolean literal: {s:?}"))?
            .to_sql(ty, out),
        Type::INT2 => s.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(s)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::DATE => chrono::NaiveDate::from_str(s)?.to_sql(ty, out),
        Type::TIMESTAMP => chrono::NaiveDateTime::from_str(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => chrono::DateTime::<chrono::FixedOffset>::parse_from_rfc3339(s)?
            .with_timezone(&chrono::Utc)
            .to_sql(ty, out),
        _ => Err(format!("cannot bind text to a parameter of type {ty}").into()),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ if is_text(ty) => b.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ if is_text(ty) => i.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Real(r) => match *ty {
                Type::FLOAT4 => (*r as f32).to_sql(ty, out),
                Type::FLOAT8 => r.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*r)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 if r.fract() == 0.0 => {
                    Value::Int(*r as i64).to_sql(ty, out)
                }
                _ if is_text(ty) => r.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_classification() {
        assert_eq!(Value::from_literal("18"), Value::Text("18".into()));
        assert_eq!(Value::from_literal("TRUE"), Value::Text("TRUE".into()));
        assert_eq!(Value::from_literal("null"), Value::Null);
        assert_eq!(Value::from_literal(" NULL "), Value::Null);
        assert_eq!(Value::from_literal("active"), Value::Text("active".into()));
        assert_eq!(Value::from_literal("'42'"), Value::Text("42".into()));
        assert_eq!(Value::from_literal("'null'"), Value::Text("null".into()));
        assert_eq!(Value::from_literal("\"a, b\""), Value::Text("a, b".into()));
        assert_eq!(Value::from_literal("'"), Value::Text("'".into()));
    }

    #[test]
    fn literals_keep_their_spelling_for_text_columns() {
        for raw in ["02134", "+15551234", "1.50", "1e3", "TRUE"] {
            let mut buf = BytesMut::new();
            assert!(Value::from_literal(raw).to_sql(&Type::TEXT, &mut buf).is_ok());
            assert_eq!(&buf[..], raw.as_bytes(), "literal {raw:?}");
        }
    }

    #[test]
    fn literals_convert_to_inferred_types() {
        let mut buf = BytesMut::new();
        assert!(Value::from_literal("02134").to_sql(&Type::INT4, &mut buf).is_ok());
        assert_eq!(&buf[..], &2134i32.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::from_literal("TRUE").to_sql(&Type::BOOL, &mut buf).is_ok());
        assert_eq!(&buf[..], &[1]);

        let mut buf = BytesMut::new();
        assert!(Value::from_literal("2.5").to_sql(&Type::FLOAT8, &mut buf).is_ok());
        assert_eq!(&buf[..], &2.5f64.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::from_literal("1.50").to_sql(&Type::NUMERIC, &mut buf).is_ok());
    }

    #[test]
    fn sanitized_only_touches_text() {
        assert_eq!(
            Value::Text("<b>x</b> & y".into()).sanitized(),
            Value::Text("x &amp; y".into())
        );
        assert_eq!(Value::Int(7).sanitized(), Value::Int(7));
        assert_eq!(Value::Bool(false).sanitized(), Value::Bool(false));
        assert_eq!(Value::Null.sanitized(), Value::Null);
    }

    #[test]
    fn binds_across_types() {
        let mut buf = BytesMut::new();
        assert!(Value::Text("18".into()).to_sql(&Type::INT4, &mut buf).is_ok());
        assert_eq!(&buf[..], &18i32.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::Int(5).to_sql(&Type::TEXT, &mut buf).is_ok());
        assert_eq!(&buf[..], b"5");

        let mut buf = BytesMut::new();
        assert!(Value::Text("abc".into()).to_sql(&Type::INT4, &mut buf).is_err());

        let mut buf = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());

        let mut buf = BytesMut::new();
        assert!(matches!(Value::Null.to_sql(&Type::INT8, &mut buf), Ok(IsNull::Yes)));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(1),
            Value::Text("a".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,true,1,"a"]"#);
    }
}
