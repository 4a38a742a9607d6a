//! Tuple decoder.

use crate::error::{TupleError, TupleResult};
use crate::id::Id;
use crate::value::{tag, Value};
use chrono::{DateTime, NaiveDate};
use ulid::Ulid;
use uuid::Uuid;

/// Decodes a single value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, so callers can parse
/// encodings embedded in longer byte strings (index keys).
///
/// # Errors
///
/// Returns an error on truncated input, unknown tags, or malformed
/// payloads.
pub fn decode_value(bytes: &[u8]) -> TupleResult<(Value, usize)> {
    let (&tag_byte, rest) = bytes.split_first().ok_or(TupleError::UnexpectedEof)?;
    let (value, payload_len) = match tag_byte {
        tag::BINARY => {
            let (raw, used) = unescape(rest)?;
            (Value::Binary(raw), used)
        }
        tag::STRING => {
            let (raw, used) = unescape(rest)?;
            let s = String::from_utf8(raw)
                .map_err(|_| TupleError::invalid_payload("string payload is not UTF-8"))?;
            (Value::String(s), used)
        }
        tag::BOOLEAN => {
            let b = match rest.first() {
                Some(0) => false,
                Some(1) => true,
                Some(other) => {
                    return Err(TupleError::invalid_payload(format!(
                        "boolean payload byte {other:#04x}"
                    )))
                }
                None => return Err(TupleError::UnexpectedEof),
            };
            (Value::Boolean(b), 1)
        }
        tag::INT8_NEG | tag::INT8_POS => {
            let raw = *rest.first().ok_or(TupleError::UnexpectedEof)?;
            (Value::Int8((raw ^ 0x80) as i8), 1)
        }
        tag::INT16_NEG | tag::INT16_POS => {
            let raw = u16::from_be_bytes(fixed::<2>(rest)?);
            (Value::Int16((raw ^ (1 << 15)) as i16), 2)
        }
        tag::INT32_NEG | tag::INT32_POS => {
            let raw = u32::from_be_bytes(fixed::<4>(rest)?);
            (Value::Int32((raw ^ (1 << 31)) as i32), 4)
        }
        tag::INT64_NEG | tag::INT64_POS => {
            (Value::Int64(from_offset_binary(fixed::<8>(rest)?)), 8)
        }
        tag::FLOAT32 => {
            let raw = u32::from_be_bytes(fixed::<4>(rest)?);
            let mask = if raw >> 31 == 1 { 1 << 31 } else { u32::MAX };
            (Value::Float32(f32::from_bits(raw ^ mask)), 4)
        }
        tag::FLOAT64 => {
            let raw = u64::from_be_bytes(fixed::<8>(rest)?);
            let mask = if raw >> 63 == 1 { 1 << 63 } else { u64::MAX };
            (Value::Float64(f64::from_bits(raw ^ mask)), 8)
        }
        tag::TIMESTAMP => {
            let secs = from_offset_binary(fixed::<8>(rest)?);
            let t = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                TupleError::invalid_payload(format!("timestamp {secs} out of range"))
            })?;
            (Value::Timestamp(t), 8)
        }
        tag::DATE => {
            let raw = u32::from_be_bytes(fixed::<4>(rest)?);
            let days = (raw ^ (1 << 31)) as i32;
            let d = NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                TupleError::invalid_payload(format!("date day number {days} out of range"))
            })?;
            (Value::Date(d), 4)
        }
        tag::REF => (
            Value::Ref(Id::new(from_offset_binary(fixed::<8>(rest)?))),
            8,
        ),
        tag::UUID => (Value::Uuid(Uuid::from_bytes(fixed::<16>(rest)?)), 16),
        tag::ULID => (Value::Ulid(Ulid::from_bytes(fixed::<16>(rest)?)), 16),
        other => return Err(TupleError::UnknownTag { tag: other }),
    };
    Ok((value, 1 + payload_len))
}

fn fixed<const N: usize>(bytes: &[u8]) -> TupleResult<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or(TupleError::UnexpectedEof)
}

fn from_offset_binary(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

/// Reads an escaped byte string up to its bare `0x00` terminator.
///
/// Returns the unescaped bytes and the encoded length including the
/// terminator.
fn unescape(bytes: &[u8]) -> TupleResult<(Vec<u8>, usize)> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != 0x00 {
            out.push(b);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(0xff) => {
                out.push(0x00);
                i += 2;
            }
            _ => return Ok((out, i + 1)),
        }
    }
    Err(TupleError::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_value;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn roundtrip(value: Value) {
        let bytes = encode_value(&value);
        let (decoded, used) = decode_value(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn roundtrip_all_variants() {
        roundtrip(Value::Ref(Id::new(-522)));
        roundtrip(Value::String("hello".to_string()));
        roundtrip(Value::String("nul\u{0}inside".to_string()));
        roundtrip(Value::Boolean(true));
        roundtrip(Value::Int64(i64::MIN));
        roundtrip(Value::Int32(-40_000));
        roundtrip(Value::Int16(32_000));
        roundtrip(Value::Int8(-128));
        roundtrip(Value::Float64(-2.5));
        roundtrip(Value::Float32(1.25));
        roundtrip(Value::Timestamp(
            Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
        ));
        roundtrip(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
        roundtrip(Value::Binary(vec![0x00, 0xff, 0x00, 0x01]));
        roundtrip(Value::Uuid(Uuid::from_u128(0x1234_5678_9abc_def0)));
        roundtrip(Value::Ulid(Ulid::from_parts(1_700_000_000_000, 42)));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = encode_value(&Value::Int64(99));
        assert_eq!(
            decode_value(&bytes[..5]),
            Err(TupleError::UnexpectedEof)
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let bytes = encode_value(&Value::String("abc".to_string()));
        // Drop the terminator.
        assert_eq!(
            decode_value(&bytes[..bytes.len() - 1]),
            Err(TupleError::UnexpectedEof)
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            decode_value(&[0x7f, 0x00]),
            Err(TupleError::UnknownTag { tag: 0x7f })
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(decode_value(&[]), Err(TupleError::UnexpectedEof));
    }

    proptest! {
        #[test]
        fn prop_int64_roundtrip(n in any::<i64>()) {
            let bytes = encode_value(&Value::Int64(n));
            let (decoded, used) = decode_value(&bytes).unwrap();
            prop_assert_eq!(decoded, Value::Int64(n));
            prop_assert_eq!(used, bytes.len());
        }

        #[test]
        fn prop_string_roundtrip(s in ".*") {
            let bytes = encode_value(&Value::String(s.clone()));
            let (decoded, used) = decode_value(&bytes).unwrap();
            prop_assert_eq!(decoded, Value::String(s));
            prop_assert_eq!(used, bytes.len());
        }

        #[test]
        fn prop_binary_roundtrip(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let bytes = encode_value(&Value::Binary(raw.clone()));
            let (decoded, used) = decode_value(&bytes).unwrap();
            prop_assert_eq!(decoded, Value::Binary(raw));
            prop_assert_eq!(used, bytes.len());
        }
    }
}
