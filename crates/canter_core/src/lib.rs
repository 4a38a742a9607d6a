//! # Canter Core
//!
//! The transaction resolution and indexing core of Canter: an embedded,
//! immutable triplestore that records (entity, attribute, value, tx) facts
//! over a sorted key-value backend and serves point-in-time entity reads.
//!
//! This crate provides:
//! - The ident registry: names bound to numeric IDs, preloaded with the
//!   system idents
//! - The schema cache: per-attribute type/cardinality/uniqueness snapshots
//! - The indexer contract and its KV-backed implementation maintaining the
//!   four covering indexes (EAVT, AEVT, AVET, VAET)
//! - The multi-pass transaction resolver: assertion expansion, attribute
//!   resolution, typed value coercion, temp-ID unification and
//!   unique-attribute upsert, ID allocation, and the atomic index write
//! - The entity reader and unique-attribute lookups
//! - Bootstrap of the system schema at database birth
//!
//! ## Example
//!
//! ```rust
//! use canter_core::{connect, Config, EntityData, KvStore, Lookup};
//! use canter_kv::MemoryBackend;
//! use std::sync::Arc;
//!
//! # fn main() -> canter_core::CoreResult<()> {
//! let store = Arc::new(KvStore::new(Arc::new(MemoryBackend::new()))?);
//! let conn = connect(Config::from_store(store));
//! conn.initialize_db()?;
//!
//! conn.assert(&[&EntityData::new()
//!     .with("db/ident", "person/email")
//!     .with("db/type", "db.type/string")
//!     .with("db/unique", true)
//!     .with("db/cardinality", "db.cardinality/one")])?;
//!
//! conn.assert(&[&EntityData::new().with("person/email", "ann@example.com")])?;
//!
//! let ann = conn.get_entity(&Lookup::new("person/email", "ann@example.com"))?;
//! assert!(!ann.id().is_unresolved());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bootstrap;
mod coerce;
mod connection;
mod entity;
mod error;
mod fact;
mod id;
mod ident;
mod index;
mod kvstore;
mod lookup;
mod schema;
mod stream;
mod transact;

pub use connection::{connect, AssertResult, Config, Connection, Database, TempIds};
pub use entity::{Entity, EntityData, EntitySnapshot, EntityValue};
pub use error::{CoreError, CoreResult};
pub use fact::{AssertMode, Fact, ResolvedAssertion};
pub use id::{
    IdSource, Resolve, TempId, ID_CARDINALITY, ID_CARDINALITY_MANY, ID_CARDINALITY_ONE,
    ID_COMPOSITE_COMPONENTS, ID_DOC, ID_ID, ID_IDENT, ID_INDEXED, ID_TX_COMMIT_TIME, ID_TYPE,
    ID_TYPE_BINARY, ID_TYPE_BOOLEAN, ID_TYPE_COMPOSITE, ID_TYPE_DATE, ID_TYPE_DECIMAL,
    ID_TYPE_FLOAT32, ID_TYPE_FLOAT64, ID_TYPE_INT16, ID_TYPE_INT32, ID_TYPE_INT64, ID_TYPE_INT8,
    ID_TYPE_REF, ID_TYPE_STRING, ID_TYPE_TIMESTAMP, ID_TYPE_ULID, ID_TYPE_UUID, ID_UNIQUE,
};
pub use ident::{Ident, IdentRef, IdentStore};
pub use index::Indexer;
pub use kvstore::KvStore;
pub use lookup::Lookup;
pub use schema::AttributeSchema;
pub use stream::{FactStream, ScanControl, StreamCtx};
pub use transact::{
    assert_fact, redact_fact, retract_fact, Assertable, Assertion, AssertValue, AttrRef, EntityRef,
};

pub use canter_tuple::{Id, Value};
