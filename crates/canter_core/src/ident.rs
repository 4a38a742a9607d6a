//! Idents and the preloaded two-way ident cache.

use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::id::{self, Id, Resolve};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// A resolved ident: a numeric ID bound to a namespaced name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The numeric ID.
    pub id: Id,
    /// The namespaced name, e.g. `"person/email"`.
    pub name: String,
}

impl Ident {
    /// Creates a resolved ident.
    #[must_use]
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Creates an ident known only by name; resolution happens lazily.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Id::new(0),
            name: name.into(),
        }
    }
}

impl Resolve for Ident {
    fn resolve(&self, conn: &Connection) -> CoreResult<Id> {
        if !self.id.is_unresolved() {
            return Ok(self.id);
        }
        Ok(conn.resolve_ident(self.name.as_str())?.id)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An input that [`Connection::resolve_idents`] can turn into an [`Ident`].
#[derive(Debug, Clone, PartialEq)]
pub enum IdentRef {
    /// Already resolved; passed through.
    Ident(Ident),
    /// A numeric ID to look up.
    Id(Id),
    /// A name to look up.
    Name(String),
}

impl From<Ident> for IdentRef {
    fn from(ident: Ident) -> Self {
        IdentRef::Ident(ident)
    }
}

impl From<Id> for IdentRef {
    fn from(id: Id) -> Self {
        IdentRef::Id(id)
    }
}

impl From<&str> for IdentRef {
    fn from(name: &str) -> Self {
        IdentRef::Name(name.to_string())
    }
}

impl From<String> for IdentRef {
    fn from(name: String) -> Self {
        IdentRef::Name(name)
    }
}

/// Persistent storage for the ident table.
///
/// Each connection keeps an in-memory cache over this store; because the
/// system maintains well-known idents at negative IDs, implementations must
/// only ever allocate positive IDs for new idents.
pub trait IdentStore: Send + Sync {
    /// Loads every stored ident, for cache hydration.
    fn load_idents(&self) -> CoreResult<Vec<Ident>>;

    /// Returns the IDs for all supplied names, in order.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoSuchIdent`] if any name is unknown.
    fn lookup_ident_ids(&self, names: &[&str]) -> CoreResult<Vec<Id>>;

    /// Returns the names for all supplied IDs, in order.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoSuchIdent`] if any ID is unknown.
    fn lookup_ident_names(&self, ids: &[Id]) -> CoreResult<Vec<String>>;

    /// Stores an ident binding.
    ///
    /// # Errors
    ///
    /// [`CoreError::IdentAlreadyExists`] if the name is already bound to a
    /// different ID. Bindings are immutable once stored.
    fn store_ident(&self, ident: &Ident) -> CoreResult<()>;
}

/// The names paired with every system ident ID.
pub(crate) fn system_idents() -> Vec<Ident> {
    [
        (id::ID_ID, "db/id"),
        (id::ID_IDENT, "db/ident"),
        (id::ID_TYPE, "db/type"),
        (id::ID_COMPOSITE_COMPONENTS, "db/compositeComponents"),
        (id::ID_CARDINALITY, "db/cardinality"),
        (id::ID_UNIQUE, "db/unique"),
        (id::ID_INDEXED, "db/indexed"),
        (id::ID_DOC, "db/doc"),
        (id::ID_TX_COMMIT_TIME, "db.tx/commitTime"),
        (id::ID_CARDINALITY_ONE, "db.cardinality/one"),
        (id::ID_CARDINALITY_MANY, "db.cardinality/many"),
        (id::ID_TYPE_STRING, "db.type/string"),
        (id::ID_TYPE_BOOLEAN, "db.type/boolean"),
        (id::ID_TYPE_INT64, "db.type/int64"),
        (id::ID_TYPE_INT32, "db.type/int32"),
        (id::ID_TYPE_INT16, "db.type/int16"),
        (id::ID_TYPE_INT8, "db.type/int8"),
        (id::ID_TYPE_FLOAT64, "db.type/float64"),
        (id::ID_TYPE_FLOAT32, "db.type/float32"),
        (id::ID_TYPE_DECIMAL, "db.type/decimal"),
        (id::ID_TYPE_TIMESTAMP, "db.type/timestamp"),
        (id::ID_TYPE_DATE, "db.type/date"),
        (id::ID_TYPE_REF, "db.type/ref"),
        (id::ID_TYPE_BINARY, "db.type/binary"),
        (id::ID_TYPE_UUID, "db.type/uuid"),
        (id::ID_TYPE_ULID, "db.type/ulid"),
        (id::ID_TYPE_COMPOSITE, "db.type/composite"),
    ]
    .into_iter()
    .map(|(id, name)| Ident::new(id, name))
    .collect()
}

struct CacheInner {
    idents: Vec<Ident>,
    by_id: HashMap<Id, usize>,
    by_name: HashMap<String, usize>,
}

/// Two-way ID/name cache over an [`IdentStore`].
///
/// Seeded with the system ident table at construction; user idents are
/// added on hydration and on first resolution. One mutex covers both index
/// maps so they can never disagree.
pub(crate) struct IdentCache {
    inner: Mutex<CacheInner>,
}

impl IdentCache {
    pub(crate) fn new() -> Self {
        let cache = Self {
            inner: Mutex::new(CacheInner {
                idents: Vec::with_capacity(256),
                by_id: HashMap::with_capacity(256),
                by_name: HashMap::with_capacity(256),
            }),
        };
        cache.store(&system_idents());
        cache
    }

    /// Inserts idents, skipping IDs already present.
    pub(crate) fn store(&self, idents: &[Ident]) {
        let mut inner = self.inner.lock();
        for ident in idents {
            if inner.by_id.contains_key(&ident.id) {
                continue;
            }
            let idx = inner.idents.len();
            inner.idents.push(ident.clone());
            inner.by_id.insert(ident.id, idx);
            inner.by_name.insert(ident.name.clone(), idx);
        }
    }

    pub(crate) fn lookup_by_id(&self, id: Id) -> Option<Ident> {
        let inner = self.inner.lock();
        inner.by_id.get(&id).map(|&idx| inner.idents[idx].clone())
    }

    pub(crate) fn lookup_by_name(&self, name: &str) -> Option<Ident> {
        let inner = self.inner.lock();
        inner.by_name.get(name).map(|&idx| inner.idents[idx].clone())
    }
}

/// Rejects user-supplied names in the reserved system namespace.
pub(crate) fn guard_reserved_name(name: &str) -> CoreResult<()> {
    if name.starts_with("db/") {
        return Err(CoreError::ReservedNamespace {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_seeded_with_system_idents() {
        let cache = IdentCache::new();
        assert_eq!(
            cache.lookup_by_name("db/ident"),
            Some(Ident::new(id::ID_IDENT, "db/ident"))
        );
        assert_eq!(
            cache.lookup_by_id(id::ID_TYPE_REF),
            Some(Ident::new(id::ID_TYPE_REF, "db.type/ref"))
        );
    }

    #[test]
    fn store_is_idempotent_per_id() {
        let cache = IdentCache::new();
        cache.store(&[Ident::new(Id::new(7), "a/b")]);
        cache.store(&[Ident::new(Id::new(7), "a/other")]);
        // First binding wins; the ID is never rebound.
        assert_eq!(cache.lookup_by_id(Id::new(7)).unwrap().name, "a/b");
    }

    #[test]
    fn lookup_miss_returns_none() {
        let cache = IdentCache::new();
        assert_eq!(cache.lookup_by_name("nope/nothing"), None);
        assert_eq!(cache.lookup_by_id(Id::new(12345)), None);
    }

    #[test]
    fn reserved_namespace_is_rejected() {
        assert!(guard_reserved_name("db/custom").is_err());
        assert!(guard_reserved_name("db.type/custom").is_ok());
        assert!(guard_reserved_name("person/email").is_ok());
    }

    #[test]
    fn system_table_ids_are_distinct() {
        let idents = system_idents();
        let mut ids: Vec<_> = idents.iter().map(|i| i.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), idents.len());
    }
}
