//! System schema installation.

use crate::connection::{Connection, TempIds};
use crate::error::CoreResult;
use crate::fact::{AssertMode, Fact, ResolvedAssertion};
use crate::id::{self, Id, UNRESOLVED_ID};
use crate::stream::StreamCtx;
use canter_tuple::Value;
use chrono::Utc;
use tracing::{debug, info};

impl Connection {
    /// Installs the system schema into an empty store.
    ///
    /// The very first transaction cannot go through the normal resolution
    /// pipeline because there is no schema to consult, so the schema facts
    /// are built directly as resolved assertions over the well-known
    /// negative system IDs.
    ///
    /// Re-running on an initialized store is detected and skipped, so the
    /// call is idempotent.
    pub fn initialize_db(&self) -> CoreResult<()> {
        // db/ident's own schema entity is written by bootstrap and only by
        // bootstrap, so its presence marks an initialized store.
        let probe = self
            .indexer()
            .scan_eavt(id::ID_IDENT, Some(id::ID_TYPE))?
            .collect(&StreamCtx::new())?;
        if !probe.is_empty() {
            debug!("store already initialized; skipping bootstrap");
            return Ok(());
        }

        let mut tx = UNRESOLVED_ID;
        while tx.is_unresolved() {
            tx = self.id_source().next_id()?;
        }

        let mut assertions = Vec::with_capacity(128);
        assertions.push(ResolvedAssertion::new(
            Fact {
                entity: tx,
                attribute: id::ID_TX_COMMIT_TIME,
                value: Value::Timestamp(Utc::now()),
                tx,
            },
            AssertMode::Addition,
        ));

        for (entity, facts) in system_schema() {
            for (attribute, value) in facts {
                assertions.push(ResolvedAssertion::new(
                    Fact {
                        entity,
                        attribute,
                        value,
                        tx,
                    },
                    AssertMode::Addition,
                ));
            }
        }

        self.write_resolved(assertions, TempIds::default())?;
        info!(%tx, "installed system schema");
        Ok(())
    }
}

/// The schema-defining facts of every system entity.
fn system_schema() -> Vec<(Id, Vec<(Id, Value)>)> {
    let mut entities = vec![
        (
            id::ID_ID,
            schema_attr(
                id::ID_ID,
                id::ID_TYPE_INT64,
                true,
                "Entity ID",
            ),
        ),
        (
            id::ID_IDENT,
            schema_attr(
                id::ID_IDENT,
                id::ID_TYPE_REF,
                true,
                "Global ident. Should be applied to schema entities and global values like enum variants.",
            ),
        ),
        (
            id::ID_TYPE,
            schema_attr(id::ID_TYPE, id::ID_TYPE_REF, false, "Schema entity type"),
        ),
        (
            id::ID_CARDINALITY,
            schema_attr(
                id::ID_CARDINALITY,
                id::ID_TYPE_REF,
                false,
                "Cardinality of an attribute. Enumerated value: db.cardinality/one or db.cardinality/many",
            ),
        ),
        (
            id::ID_UNIQUE,
            schema_attr(
                id::ID_UNIQUE,
                id::ID_TYPE_BOOLEAN,
                false,
                "Whether an attribute is unique. If true, only one entity may have a given value for the attribute.",
            ),
        ),
        (
            id::ID_INDEXED,
            schema_attr(
                id::ID_INDEXED,
                id::ID_TYPE_BOOLEAN,
                false,
                "Whether an attribute is indexed. If true, the attribute will be indexed in the AVET index.",
            ),
        ),
        (
            id::ID_DOC,
            schema_attr(
                id::ID_DOC,
                id::ID_TYPE_STRING,
                false,
                "Documentation for an attribute or entity.",
            ),
        ),
        (
            id::ID_TX_COMMIT_TIME,
            schema_attr(
                id::ID_TX_COMMIT_TIME,
                id::ID_TYPE_TIMESTAMP,
                false,
                "Timestamp of the transaction commit.",
            ),
        ),
    ];

    // Enumerated values carry only their own ident.
    for variant in [
        id::ID_CARDINALITY_ONE,
        id::ID_CARDINALITY_MANY,
        id::ID_TYPE_STRING,
        id::ID_TYPE_BOOLEAN,
        id::ID_TYPE_INT64,
        id::ID_TYPE_INT32,
        id::ID_TYPE_INT16,
        id::ID_TYPE_INT8,
        id::ID_TYPE_FLOAT64,
        id::ID_TYPE_FLOAT32,
        id::ID_TYPE_DECIMAL,
        id::ID_TYPE_TIMESTAMP,
        id::ID_TYPE_DATE,
        id::ID_TYPE_REF,
        id::ID_TYPE_BINARY,
        id::ID_TYPE_UUID,
        id::ID_TYPE_ULID,
        id::ID_TYPE_COMPOSITE,
    ] {
        entities.push((variant, vec![(id::ID_IDENT, Value::Ref(variant))]));
    }

    entities
}

/// The facts shared by every schema attribute entity: self-ident, type,
/// cardinality/one, optional uniqueness, and a doc string.
fn schema_attr(entity: Id, value_type: Id, unique: bool, doc: &str) -> Vec<(Id, Value)> {
    let mut facts = vec![
        (id::ID_IDENT, Value::Ref(entity)),
        (id::ID_TYPE, Value::Ref(value_type)),
        (id::ID_CARDINALITY, Value::Ref(id::ID_CARDINALITY_ONE)),
        (id::ID_DOC, Value::String(doc.to_string())),
    ];
    if unique {
        facts.push((id::ID_UNIQUE, Value::Boolean(true)));
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{connect, Config};
    use crate::kvstore::KvStore;
    use canter_kv::MemoryBackend;
    use std::sync::Arc;

    fn connection() -> Connection {
        let store = Arc::new(KvStore::new(Arc::new(MemoryBackend::new())).unwrap());
        connect(Config::from_store(store))
    }

    #[test]
    fn bootstrap_writes_schema_facts() {
        let conn = connection();
        conn.initialize_db().unwrap();

        let schema = conn.schema_entity(id::ID_IDENT).unwrap();
        assert_eq!(schema.value_type, Some(id::ID_TYPE_REF));
        assert!(schema.unique);

        let doc_schema = conn.schema_entity(id::ID_DOC).unwrap();
        assert_eq!(doc_schema.value_type, Some(id::ID_TYPE_STRING));
        assert!(!doc_schema.unique);
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let conn = connection();
        conn.initialize_db().unwrap();

        let before = conn
            .indexer()
            .scan_eavt(id::ID_IDENT, None)
            .unwrap()
            .collect(&StreamCtx::new())
            .unwrap();

        conn.initialize_db().unwrap();

        let after = conn
            .indexer()
            .scan_eavt(id::ID_IDENT, None)
            .unwrap()
            .collect(&StreamCtx::new())
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn transaction_entity_records_commit_time() {
        let conn = connection();
        conn.initialize_db().unwrap();

        // The bootstrap transaction's own entity carries the commit-time
        // fact; tx 1 is the first allocated ID.
        let facts = conn
            .indexer()
            .scan_eavt(Id::new(1), Some(id::ID_TX_COMMIT_TIME))
            .unwrap()
            .collect(&StreamCtx::new())
            .unwrap();
        assert_eq!(facts.len(), 1);
        assert!(matches!(facts[0].value, Value::Timestamp(_)));
    }
}
