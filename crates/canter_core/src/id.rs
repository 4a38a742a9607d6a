//! Identifiers, temp IDs, and the system ident ID table.

use crate::connection::Connection;
use crate::error::CoreResult;
use std::fmt;
use ulid::Ulid;

pub use canter_tuple::Id;

/// Sentinel meaning "this temp ID has not been bound yet".
pub(crate) const UNRESOLVED_ID: Id = Id::new(0);

/// Something that can resolve to a concrete entity ID at transaction time.
///
/// Implemented by [`Id`] (trivially), [`crate::Ident`] (via the ident
/// registry), and [`crate::Lookup`] (via a unique-attribute index probe).
pub trait Resolve {
    /// Resolves to a concrete ID.
    fn resolve(&self, conn: &Connection) -> CoreResult<Id>;
}

impl Resolve for Id {
    fn resolve(&self, _conn: &Connection) -> CoreResult<Id> {
        Ok(*self)
    }
}

/// A transaction-scoped placeholder ID.
///
/// All assertions mentioning the same temp ID within one transaction
/// resolve to the same final ID. Symbols are opaque; fresh ones are ULIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempId {
    symbol: String,
}

impl TempId {
    /// Creates a temp ID with a fresh unique symbol.
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbol: Ulid::new().to_string(),
        }
    }

    /// Creates a temp ID carrying a specific symbol.
    #[must_use]
    pub(crate) fn with_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Returns the symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temp:{}", self.symbol)
    }
}

/// Source of newly allocated entity IDs.
///
/// Allocation is atomic across concurrent callers and never yields the
/// unresolved sentinel `0`.
pub trait IdSource: Send + Sync {
    /// Allocates the next ID.
    fn next_id(&self) -> CoreResult<Id>;
}

// System-managed idents. These IDs are stable constants; the matching names
// live in the ident registry's preload table.

/// `db/id`
pub const ID_ID: Id = Id::new(-1);
/// `db/ident`
pub const ID_IDENT: Id = Id::new(-2);
/// `db/type`
pub const ID_TYPE: Id = Id::new(-3);
/// `db/compositeComponents`
pub const ID_COMPOSITE_COMPONENTS: Id = Id::new(-4);
/// `db/cardinality`
pub const ID_CARDINALITY: Id = Id::new(-5);
/// `db/unique`
pub const ID_UNIQUE: Id = Id::new(-6);
/// `db/indexed`
pub const ID_INDEXED: Id = Id::new(-7);
/// `db/doc`
pub const ID_DOC: Id = Id::new(-8);
/// `db.tx/commitTime`
pub const ID_TX_COMMIT_TIME: Id = Id::new(-9);

// System-managed enumerated values.

/// `db.cardinality/one`
pub const ID_CARDINALITY_ONE: Id = Id::new(-10);
/// `db.cardinality/many`
pub const ID_CARDINALITY_MANY: Id = Id::new(-11);

/// `db.type/string`
pub const ID_TYPE_STRING: Id = Id::new(-511);
/// `db.type/boolean`
pub const ID_TYPE_BOOLEAN: Id = Id::new(-512);
/// `db.type/int64`
pub const ID_TYPE_INT64: Id = Id::new(-513);
/// `db.type/int32`
pub const ID_TYPE_INT32: Id = Id::new(-514);
/// `db.type/int16`
pub const ID_TYPE_INT16: Id = Id::new(-515);
/// `db.type/int8`
pub const ID_TYPE_INT8: Id = Id::new(-516);
/// `db.type/float64`
pub const ID_TYPE_FLOAT64: Id = Id::new(-517);
/// `db.type/float32`
pub const ID_TYPE_FLOAT32: Id = Id::new(-518);
/// `db.type/decimal`
pub const ID_TYPE_DECIMAL: Id = Id::new(-519);
/// `db.type/timestamp`
pub const ID_TYPE_TIMESTAMP: Id = Id::new(-520);
/// `db.type/date`
pub const ID_TYPE_DATE: Id = Id::new(-521);
/// `db.type/ref`
pub const ID_TYPE_REF: Id = Id::new(-522);
/// `db.type/binary`
pub const ID_TYPE_BINARY: Id = Id::new(-523);
/// `db.type/uuid`
pub const ID_TYPE_UUID: Id = Id::new(-524);
/// `db.type/ulid`
pub const ID_TYPE_ULID: Id = Id::new(-525);
/// `db.type/composite`
pub const ID_TYPE_COMPOSITE: Id = Id::new(-526);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_temp_ids_are_distinct() {
        assert_ne!(TempId::new(), TempId::new());
    }

    #[test]
    fn temp_id_symbol_is_stable_across_clones() {
        let t = TempId::new();
        assert_eq!(t.symbol(), t.clone().symbol());
    }

    #[test]
    fn system_ids_are_negative() {
        for id in [ID_ID, ID_IDENT, ID_TYPE, ID_TX_COMMIT_TIME, ID_TYPE_COMPOSITE] {
            assert!(id.as_i64() < 0);
        }
    }
}
