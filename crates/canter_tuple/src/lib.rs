//! # Canter Tuple
//!
//! Order-preserving value encoding for Canter indexes.
//!
//! This crate owns the wire data model of the store: entity [`Id`]s, typed
//! [`Value`]s, and the tuple encoding that serializes values into index
//! keys. The encoding guarantees:
//!
//! - Bytewise lexicographic order of encodings equals the logical order of
//!   values of the same type, so prefix range scans over AVET and VAET
//!   return values in order
//! - Every encoding is self-describing (a one-byte type tag) and
//!   self-delimiting, so encodings can be embedded mid-key
//! - Integers carry separate tags for the negative and positive ranges,
//!   keeping numeric order across the sign boundary
//!
//! The scheme follows FoundationDB's tuple layer: escaped, terminated byte
//! strings; offset-binary integers; totally ordered float bit patterns.
//!
//! ## Example
//!
//! ```
//! use canter_tuple::{decode_value, encode_value, Value};
//!
//! let a = encode_value(&Value::Int64(-3));
//! let b = encode_value(&Value::Int64(40));
//! assert!(a < b);
//!
//! let (decoded, used) = decode_value(&b).unwrap();
//! assert_eq!(decoded, Value::Int64(40));
//! assert_eq!(used, b.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod id;
mod value;

pub use decoder::decode_value;
pub use encoder::encode_value;
pub use error::{TupleError, TupleResult};
pub use id::Id;
pub use value::Value;
