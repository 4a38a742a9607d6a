//! Order-preserving value encoder.

use crate::value::{tag, Value};
use chrono::Datelike;

/// Encodes a value into its order-preserving tuple form.
///
/// The output starts with a one-byte type tag and is self-delimiting, so it
/// may be embedded in the middle of an index key. For values of the same
/// type, bytewise comparison of encodings matches logical comparison of the
/// values.
#[must_use]
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    encode_into(value, &mut out);
    out
}

/// Encodes a value, appending to an existing buffer.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Binary(bytes) => {
            out.push(tag::BINARY);
            escape_into(bytes, out);
        }
        Value::String(s) => {
            out.push(tag::STRING);
            escape_into(s.as_bytes(), out);
        }
        Value::Boolean(b) => {
            out.push(tag::BOOLEAN);
            out.push(u8::from(*b));
        }
        Value::Int8(n) => {
            out.push(if *n < 0 { tag::INT8_NEG } else { tag::INT8_POS });
            out.push((*n as u8) ^ 0x80);
        }
        Value::Int16(n) => {
            out.push(if *n < 0 { tag::INT16_NEG } else { tag::INT16_POS });
            out.extend_from_slice(&((*n as u16) ^ (1 << 15)).to_be_bytes());
        }
        Value::Int32(n) => {
            out.push(if *n < 0 { tag::INT32_NEG } else { tag::INT32_POS });
            out.extend_from_slice(&((*n as u32) ^ (1 << 31)).to_be_bytes());
        }
        Value::Int64(n) => {
            out.push(if *n < 0 { tag::INT64_NEG } else { tag::INT64_POS });
            out.extend_from_slice(&offset_binary(*n));
        }
        Value::Float32(v) => {
            out.push(tag::FLOAT32);
            let bits = v.to_bits();
            let mask = if bits >> 31 == 1 { u32::MAX } else { 1 << 31 };
            out.extend_from_slice(&(bits ^ mask).to_be_bytes());
        }
        Value::Float64(v) => {
            out.push(tag::FLOAT64);
            let bits = v.to_bits();
            let mask = if bits >> 63 == 1 { u64::MAX } else { 1 << 63 };
            out.extend_from_slice(&(bits ^ mask).to_be_bytes());
        }
        Value::Timestamp(t) => {
            out.push(tag::TIMESTAMP);
            out.extend_from_slice(&offset_binary(t.timestamp()));
        }
        Value::Date(d) => {
            out.push(tag::DATE);
            out.extend_from_slice(&((d.num_days_from_ce() as u32) ^ (1 << 31)).to_be_bytes());
        }
        Value::Ref(id) => {
            out.push(tag::REF);
            out.extend_from_slice(&offset_binary(id.as_i64()));
        }
        Value::Uuid(u) => {
            out.push(tag::UUID);
            out.extend_from_slice(u.as_bytes());
        }
        Value::Ulid(u) => {
            out.push(tag::ULID);
            out.extend_from_slice(&u.to_bytes());
        }
    }
}

/// Offset-binary form of an i64: flip the sign bit so bytewise order equals
/// numeric order.
fn offset_binary(n: i64) -> [u8; 8] {
    ((n as u64) ^ (1 << 63)).to_be_bytes()
}

/// Writes `bytes` with `0x00` escaped as `0x00 0xFF` and a bare `0x00`
/// terminator. Shorter inputs that are prefixes of longer ones sort first,
/// because the terminator is smaller than every escape continuation.
fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        out.push(b);
        if b == 0x00 {
            out.push(0xff);
        }
    }
    out.push(0x00);
}
