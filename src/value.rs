//! Values frozen into predicates and bound into commands.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MapError, MapResult};

/// Declared type of a property or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Text,
    Bytes,
    Uuid,
    DateTime,
    Date,
    Time,
    Json,
    Enum,
}

impl ValueType {
    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::Int16 | ValueType::Int32 | ValueType::Int64)
    }
}

/// An enum instance as seen by the engine: its variant name and its
/// underlying discriminant. Which one reaches the database is decided by the
/// property's [`EnumRepr`](crate::config::EnumRepr).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i64,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, number: i64) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// A value in a predicate or a bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
    Enum(EnumValue),
    List(Vec<Value>),
}

impl Value {
    /// Build a list value from anything convertible into values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Json(_) => "json",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Uuid(u) => write!(f, "\"{}\"", u),
            Value::DateTime(dt) => write!(f, "\"{}\"", dt),
            Value::Date(d) => write!(f, "\"{}\"", d),
            Value::Time(t) => write!(f, "\"{}\"", t),
            Value::Json(json) => write!(f, "{}", json),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Conversion from a database value back into a property type.
///
/// Used by key setters and by the `entity!` macro's generated setters.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> MapResult<Self>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> MapResult<T> {
    Err(MapError::Conversion {
        expected,
        found: value.kind().to_string(),
    })
}

impl FromValue for i64 {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Int(n) => Ok(n),
            Value::Decimal(d) if d.fract().is_zero() => match d.to_i64() {
                Some(n) => Ok(n),
                None => mismatch("i64", &Value::Decimal(d)),
            },
            Value::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            Value::Enum(e) => Ok(e.number),
            other => mismatch("i64", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> MapResult<Self> {
        let n = i64::from_value(value)?;
        i32::try_from(n).map_err(|_| MapError::Conversion {
            expected: "i32",
            found: n.to_string(),
        })
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> MapResult<Self> {
        let n = i64::from_value(value)?;
        i16::try_from(n).map_err(|_| MapError::Conversion {
            expected: "i16",
            found: n.to_string(),
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            Value::Decimal(d) => match d.to_f64() {
                Some(f) => Ok(f),
                None => mismatch("f64", &Value::Decimal(d)),
            },
            other => mismatch("f64", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> MapResult<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Enum(e) => Ok(e.name),
            other => mismatch("String", &other),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Int(n) => Ok(Decimal::from(n)),
            other => mismatch("Decimal", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => Uuid::parse_str(&s).map_err(|_| MapError::Conversion {
                expected: "Uuid",
                found: s,
            }),
            other => mismatch("Uuid", &other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => mismatch("NaiveDateTime", &other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::DateTime(dt) => Ok(dt.date()),
            other => mismatch("NaiveDate", &other),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Time(t) => Ok(t),
            Value::DateTime(dt) => Ok(dt.time()),
            other => mismatch("NaiveTime", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Json(json) => Ok(json),
            Value::Text(s) => serde_json::from_str(&s).map_err(|_| MapError::Conversion {
                expected: "json",
                found: s,
            }),
            other => mismatch("json", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Compile-time declared [`ValueType`] of a property type.
pub trait HasValueType {
    const VALUE_TYPE: ValueType;
}

macro_rules! has_value_type {
    ($($ty:ty => $vt:ident),* $(,)?) => {
        $(impl HasValueType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$vt;
        })*
    };
}

has_value_type! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
    serde_json::Value => Json,
}

impl<T: HasValueType> HasValueType for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
}
