//! Dynamically typed values and scalar coercion.
//!
//! [`Value`] is what records hold, what statements bind and what drivers
//! return. [`FromScalar`] converts a driver value into a concrete Rust type,
//! treating NULL and narrowing overflow as the same fault.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// A single dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
    /// Marker for an output parameter that returns a result cursor.
    Cursor,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::DateTime(_) => "datetime",
            Value::Bytes(_) => "bytes",
            Value::Cursor => "cursor",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Render as JSON. Bytes become a lower-case hex string.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null | Value::Cursor => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::Text(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Value::Bytes(b) => Json::String(b.iter().map(|x| format!("{x:02x}")).collect()),
        }
    }
}

/// Text form used when date-times are written to or parsed from storage.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Cursor => f.write_str("<cursor>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Into Value
// ---------------------------------------------------------------------------

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    // Widen through the shortest decimal text so 3.1415f32 stays 3.1415.
    fn from(v: f32) -> Self {
        Value::Float(v.to_string().parse().unwrap_or(f64::from(v)))
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// FromScalar
// ---------------------------------------------------------------------------

/// Conversion from a driver value into a concrete type.
///
/// NULL is only accepted by `Option<T>` and `Value`; for every other target
/// it fails with [`Error::NullScalar`], as does a value that does not fit.
pub trait FromScalar: Sized {
    fn from_scalar(value: Value) -> Result<Self>;
}

fn null_into(target: &str) -> Error {
    Error::null_scalar(format!("NULL cannot be converted to {target}"))
}

fn mismatch(value: &Value, target: &str) -> Error {
    Error::unsupported(format!("cannot convert {} to {target}", value.type_name()))
}

impl FromScalar for Value {
    fn from_scalar(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromScalar> FromScalar for Option<T> {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_scalar(other).map(Some),
        }
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("i64")),
            Value::Int(v) => Ok(v),
            Value::Bool(b) => Ok(i64::from(b)),
            Value::Float(f) => {
                let rounded = f.round();
                // i64::MAX as f64 rounds up to 2^63, which is already out of range.
                if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Ok(rounded as i64)
                } else {
                    Err(Error::null_scalar(format!("{f} overflows i64")))
                }
            }
            Value::Decimal(d) => d
                .round()
                .to_i64()
                .ok_or_else(|| Error::null_scalar(format!("{d} overflows i64"))),
            Value::Text(ref s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| mismatch(&value, "i64")),
            other => Err(mismatch(&other, "i64")),
        }
    }
}

macro_rules! narrow_int_from_scalar {
    ($($t:ty),*) => {
        $(impl FromScalar for $t {
            fn from_scalar(value: Value) -> Result<Self> {
                if value.is_null() {
                    return Err(null_into(stringify!($t)));
                }
                let wide = i64::from_scalar(value)?;
                <$t>::try_from(wide).map_err(|_| {
                    Error::null_scalar(format!("{wide} overflows {}", stringify!($t)))
                })
            }
        })*
    };
}

narrow_int_from_scalar!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromScalar for f64 {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("f64")),
            Value::Int(v) => Ok(v as f64),
            Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            Value::Float(f) => Ok(f),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| Error::null_scalar(format!("{d} overflows f64"))),
            Value::Text(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| mismatch(&value, "f64")),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromScalar for Decimal {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("decimal")),
            Value::Int(v) => Ok(Decimal::from(v)),
            Value::Bool(b) => Ok(Decimal::from(i64::from(b))),
            Value::Float(f) => Decimal::from_f64(f)
                .ok_or_else(|| Error::null_scalar(format!("{f} overflows decimal"))),
            Value::Decimal(d) => Ok(d),
            Value::Text(ref s) => {
                Decimal::from_str(s.trim()).map_err(|_| mismatch(&value, "decimal"))
            }
            other => Err(mismatch(&other, "decimal")),
        }
    }
}

impl FromScalar for bool {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("bool")),
            Value::Bool(b) => Ok(b),
            Value::Int(v) => Ok(v != 0),
            Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(mismatch(&value, "bool")),
            },
            other => Err(mismatch(&other, "bool")),
        }
    }
}

impl FromScalar for String {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("String")),
            Value::Text(s) => Ok(s),
            Value::Bytes(_) | Value::Cursor => Err(mismatch(&value, "String")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromScalar for NaiveDateTime {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("datetime")),
            Value::DateTime(dt) => Ok(dt),
            Value::Text(ref s) => parse_datetime(s).ok_or_else(|| mismatch(&value, "datetime")),
            other => Err(mismatch(&other, "datetime")),
        }
    }
}

impl FromScalar for Vec<u8> {
    fn from_scalar(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(null_into("bytes")),
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch(&other, "bytes")),
        }
    }
}

/// Parse the date-time text forms drivers commonly hand back.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
