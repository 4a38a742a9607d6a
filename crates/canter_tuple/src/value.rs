//! Typed stored values.

use crate::id::Id;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use ulid::Ulid;
use uuid::Uuid;

/// A typed value as stored in the database.
///
/// Each variant corresponds to one of the `db.type/*` idents. The reserved
/// `db.type/decimal` and `db.type/composite` types have no value
/// representation yet; coercion reports them as unsupported.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A reference to another entity (`db.type/ref`).
    Ref(Id),
    /// A UTF-8 string (`db.type/string`).
    String(String),
    /// A boolean (`db.type/boolean`).
    Boolean(bool),
    /// A 64-bit signed integer (`db.type/int64`).
    Int64(i64),
    /// A 32-bit signed integer (`db.type/int32`).
    Int32(i32),
    /// A 16-bit signed integer (`db.type/int16`).
    Int16(i16),
    /// An 8-bit signed integer (`db.type/int8`).
    Int8(i8),
    /// A 64-bit float (`db.type/float64`).
    Float64(f64),
    /// A 32-bit float (`db.type/float32`).
    Float32(f32),
    /// An instant in time, second precision (`db.type/timestamp`).
    Timestamp(DateTime<Utc>),
    /// A calendar date (`db.type/date`).
    Date(NaiveDate),
    /// An opaque byte string (`db.type/binary`).
    Binary(Vec<u8>),
    /// A UUID (`db.type/uuid`).
    Uuid(Uuid),
    /// A ULID (`db.type/ulid`).
    Ulid(Ulid),
}

impl Value {
    /// Returns the name of the variant's type, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Ref(_) => "ref",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Int64(_) => "int64",
            Value::Int32(_) => "int32",
            Value::Int16(_) => "int16",
            Value::Int8(_) => "int8",
            Value::Float64(_) => "float64",
            Value::Float32(_) => "float32",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Binary(_) => "binary",
            Value::Uuid(_) => "uuid",
            Value::Ulid(_) => "ulid",
        }
    }

    /// Returns the referenced entity ID if this is a `Ref`.
    #[must_use]
    pub fn as_ref_id(&self) -> Option<Id> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ref(id) => write!(f, "{id}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int16(n) => write!(f, "{n}"),
            Value::Int8(n) => write!(f, "{n}"),
            Value::Float64(n) => write!(f, "{n}"),
            Value::Float32(n) => write!(f, "{n}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Binary(b) => write!(f, "{} bytes", b.len()),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Ulid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        Value::Ref(id)
    }
}

/// Type tags used by the tuple encoding.
///
/// Integer widths carry separate tags for the negative and positive ranges
/// so that the tag ordering keeps numeric order across the sign boundary.
pub(crate) mod tag {
    pub const BINARY: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const BOOLEAN: u8 = 0x03;
    pub const INT8_NEG: u8 = 0x04;
    pub const INT8_POS: u8 = 0x05;
    pub const INT16_NEG: u8 = 0x06;
    pub const INT16_POS: u8 = 0x07;
    pub const INT32_NEG: u8 = 0x08;
    pub const INT32_POS: u8 = 0x09;
    pub const INT64_NEG: u8 = 0x0a;
    pub const INT64_POS: u8 = 0x0b;
    pub const FLOAT32: u8 = 0x0c;
    pub const FLOAT64: u8 = 0x0d;
    pub const TIMESTAMP: u8 = 0x0e;
    pub const DATE: u8 = 0x0f;
    pub const REF: u8 = 0x10;
    pub const UUID: u8 = 0x11;
    pub const ULID: u8 = 0x12;
}
