//! Typed value coercion.
//!
//! Each assertion's value arrives in one of many input shapes and must be
//! narrowed to the attribute's declared `db/type` before resolution can
//! finish. Coercion never widens at read time; what is stored is exactly
//! the declared type.

use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::id::{self, Id, Resolve, TempId};
use crate::ident::Ident;
use crate::transact::AssertValue;
use canter_tuple::Value;
use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;
use uuid::Uuid;

/// A value after coercion: either fully typed, or a temp ID that the
/// entity-resolution passes will replace with a concrete ref.
#[derive(Debug, Clone)]
pub(crate) enum CoercedValue {
    Value(Value),
    Temp(TempId),
}

/// Coerces `value` to the attribute's declared type.
pub(crate) fn coerce_value(
    conn: &Connection,
    attr: &Ident,
    value_type: Id,
    value: AssertValue,
) -> CoreResult<CoercedValue> {
    if value_type == id::ID_TYPE_REF {
        return coerce_ref(conn, attr, value);
    }
    coerce_scalar(&attr.name, value_type, value).map(CoercedValue::Value)
}

fn coerce_ref(conn: &Connection, attr: &Ident, value: AssertValue) -> CoreResult<CoercedValue> {
    // A bare string in ref position is an ident name.
    let value = match value {
        AssertValue::String(name) => AssertValue::Ident(Ident::named(name)),
        other => other,
    };

    match value {
        AssertValue::Id(id) => Ok(CoercedValue::Value(Value::Ref(id))),
        AssertValue::Temp(temp) => Ok(CoercedValue::Temp(temp)),
        AssertValue::Ident(ident) => match ident.resolve(conn) {
            Ok(id) => Ok(CoercedValue::Value(Value::Ref(id))),
            Err(CoreError::NoSuchIdent { .. }) if attr.id == id::ID_IDENT => {
                // A db/ident naming an unknown ident mints the entity's ID.
                // Storing the ident immediately makes it visible to later
                // resolutions within the same transaction.
                let id = conn.allocate_ident(&ident.name)?;
                Ok(CoercedValue::Value(Value::Ref(id)))
            }
            Err(err) => Err(err),
        },
        AssertValue::Lookup(lookup) => {
            let id = lookup.resolve(conn)?;
            Ok(CoercedValue::Value(Value::Ref(id)))
        }
        _ => Err(CoreError::not_assignable("ref", attr.name.clone())),
    }
}

/// Coerces non-ref types. Pure with respect to the connection.
fn coerce_scalar(attr_name: &str, value_type: Id, value: AssertValue) -> CoreResult<Value> {
    match value_type {
        t if t == id::ID_TYPE_STRING => coerce_string(attr_name, value),
        t if t == id::ID_TYPE_BOOLEAN => match value {
            AssertValue::Bool(b) => Ok(Value::Boolean(b)),
            _ => Err(CoreError::not_assignable("boolean", attr_name)),
        },
        t if t == id::ID_TYPE_INT64 => {
            coerce_int(attr_name, "int64", value).map(Value::Int64)
        }
        t if t == id::ID_TYPE_INT32 => coerce_narrow_int(attr_name, "int32", value, Value::Int32),
        t if t == id::ID_TYPE_INT16 => coerce_narrow_int(attr_name, "int16", value, Value::Int16),
        t if t == id::ID_TYPE_INT8 => coerce_narrow_int(attr_name, "int8", value, Value::Int8),
        t if t == id::ID_TYPE_FLOAT64 => coerce_float64(attr_name, value),
        t if t == id::ID_TYPE_FLOAT32 => coerce_float32(attr_name, value),
        t if t == id::ID_TYPE_TIMESTAMP => coerce_timestamp(attr_name, value).map(Value::Timestamp),
        t if t == id::ID_TYPE_DATE => coerce_date(attr_name, value),
        t if t == id::ID_TYPE_BINARY => match value {
            AssertValue::Bytes(b) => Ok(Value::Binary(b)),
            AssertValue::String(s) => Ok(Value::Binary(s.into_bytes())),
            _ => Err(CoreError::not_assignable("binary", attr_name)),
        },
        t if t == id::ID_TYPE_UUID => coerce_uuid(attr_name, value),
        t if t == id::ID_TYPE_ULID => coerce_ulid(attr_name, value),
        t if t == id::ID_TYPE_DECIMAL => Err(CoreError::unsupported(format!(
            "decimal type not implemented (attribute {attr_name:?})"
        ))),
        t if t == id::ID_TYPE_COMPOSITE => Err(CoreError::unsupported(format!(
            "composite type not implemented (attribute {attr_name:?})"
        ))),
        other => Err(CoreError::unsupported(format!(
            "attribute {attr_name:?} declares unhandled type {other}"
        ))),
    }
}

fn coerce_string(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    match value {
        AssertValue::String(s) => Ok(Value::String(s)),
        AssertValue::Bytes(b) => String::from_utf8(b)
            .map(Value::String)
            .map_err(|_| CoreError::not_assignable("string", attr_name)),
        _ => Err(CoreError::not_assignable("string", attr_name)),
    }
}

/// Coerces any integer shape to an i64, range-checking unsigned sources.
fn coerce_int(attr_name: &str, type_name: &'static str, value: AssertValue) -> CoreResult<i64> {
    match value {
        AssertValue::Int(n) => Ok(n),
        AssertValue::UInt(n) => {
            i64::try_from(n).map_err(|_| CoreError::out_of_range(type_name, attr_name))
        }
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            s.parse::<i64>()
                .map_err(|_| CoreError::not_assignable(type_name, attr_name))
        }
        _ => Err(CoreError::not_assignable(type_name, attr_name)),
    }
}

/// Coerces to a narrower integer width, failing on range violations.
fn coerce_narrow_int<N>(
    attr_name: &str,
    type_name: &'static str,
    value: AssertValue,
    wrap: impl FnOnce(N) -> Value,
) -> CoreResult<Value>
where
    N: TryFrom<i64>,
{
    let wide = coerce_int(attr_name, type_name, value)?;
    let narrow =
        N::try_from(wide).map_err(|_| CoreError::out_of_range(type_name, attr_name))?;
    Ok(wrap(narrow))
}

fn coerce_float64(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    let v = match value {
        AssertValue::Float(v) => v,
        AssertValue::Float32(v) => v.into(),
        AssertValue::Int(n) => n as f64,
        AssertValue::UInt(n) => n as f64,
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            s.parse::<f64>()
                .map_err(|_| CoreError::not_assignable("float64", attr_name))?
        }
        _ => return Err(CoreError::not_assignable("float64", attr_name)),
    };
    Ok(Value::Float64(v))
}

fn coerce_float32(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    let wide = match value {
        AssertValue::Float32(v) => return Ok(Value::Float32(v)),
        AssertValue::Float(v) => v,
        AssertValue::Int(n) => return Ok(Value::Float32(n as f32)),
        AssertValue::UInt(n) => return Ok(Value::Float32(n as f32)),
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            s.parse::<f64>()
                .map_err(|_| CoreError::not_assignable("float32", attr_name))?
        }
        _ => return Err(CoreError::not_assignable("float32", attr_name)),
    };
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(CoreError::out_of_range("float32", attr_name));
    }
    Ok(Value::Float32(wide as f32))
}

fn coerce_timestamp(attr_name: &str, value: AssertValue) -> CoreResult<DateTime<Utc>> {
    match value {
        AssertValue::Timestamp(t) => Ok(t),
        AssertValue::Int(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::out_of_range("timestamp", attr_name)),
        AssertValue::UInt(secs) => {
            let secs =
                i64::try_from(secs).map_err(|_| CoreError::out_of_range("timestamp", attr_name))?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CoreError::out_of_range("timestamp", attr_name))
        }
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| CoreError::not_assignable("timestamp", attr_name))
        }
        _ => Err(CoreError::not_assignable("timestamp", attr_name)),
    }
}

fn coerce_date(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    let date = match value {
        AssertValue::Date(d) => d,
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| CoreError::not_assignable("date", attr_name))?
        }
        // Timestamps and integer seconds truncate to the UTC day.
        other => coerce_timestamp(attr_name, other)
            .map_err(|err| match err {
                CoreError::NotAssignable { .. } => CoreError::not_assignable("date", attr_name),
                other => other,
            })?
            .date_naive(),
    };
    Ok(Value::Date(date))
}

fn coerce_uuid(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    match value {
        AssertValue::Uuid(u) => Ok(Value::Uuid(u)),
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|_| CoreError::not_assignable("uuid", attr_name))
        }
        AssertValue::Bytes(b) => Uuid::from_slice(&b)
            .map(Value::Uuid)
            .map_err(|_| CoreError::not_assignable("uuid", attr_name)),
        _ => Err(CoreError::not_assignable("uuid", attr_name)),
    }
}

fn coerce_ulid(attr_name: &str, value: AssertValue) -> CoreResult<Value> {
    match value {
        AssertValue::Ulid(u) => Ok(Value::Ulid(u)),
        AssertValue::String(s) => {
            if s.is_empty() {
                return Err(CoreError::NoInput);
            }
            Ulid::from_string(&s)
                .map(Value::Ulid)
                .map_err(|_| CoreError::not_assignable("ulid", attr_name))
        }
        _ => Err(CoreError::not_assignable("ulid", attr_name)),
    }
}
