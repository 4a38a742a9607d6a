//! Per-attribute schema snapshots.

use crate::error::CoreResult;
use crate::id::{
    Id, ID_CARDINALITY, ID_CARDINALITY_ONE, ID_DOC, ID_INDEXED, ID_TYPE, ID_UNIQUE,
};
use crate::index::Indexer;
use crate::stream::{ScanControl, StreamCtx};
use canter_tuple::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The schema facts of one attribute entity.
///
/// Built by a restricted EAVT read that never consults other schema:
/// schema attributes are implicitly cardinality/one, so the read cannot
/// recurse into itself.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// The attribute's entity ID.
    pub id: Id,
    /// The declared `db/type`, if the entity is a schema entity.
    pub value_type: Option<Id>,
    /// The declared `db/cardinality`; defaults to `db.cardinality/one`.
    pub cardinality: Id,
    /// Whether `db/unique` is set.
    pub unique: bool,
    /// Whether `db/indexed` is set.
    pub indexed: bool,
    /// The `db/doc` string, if any.
    pub doc: Option<String>,
}

impl AttributeSchema {
    fn empty(id: Id) -> Self {
        Self {
            id,
            value_type: None,
            cardinality: ID_CARDINALITY_ONE,
            unique: false,
            indexed: false,
            doc: None,
        }
    }
}

/// Cache of attribute schema snapshots for the lifetime of a connection.
///
/// Attribute schema is treated as immutable after first use; there is no
/// invalidation.
pub(crate) struct SchemaCache {
    inner: Mutex<HashMap<Id, Arc<AttributeSchema>>>,
}

impl SchemaCache {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached schema for `attribute`, reading it from the EAVT
    /// index on first use.
    pub(crate) fn get(
        &self,
        indexer: &dyn Indexer,
        attribute: Id,
    ) -> CoreResult<Arc<AttributeSchema>> {
        if let Some(schema) = self.inner.lock().get(&attribute) {
            return Ok(Arc::clone(schema));
        }

        let mut schema = AttributeSchema::empty(attribute);
        let scan = indexer.scan_eavt(attribute, None)?;
        scan.produce(&StreamCtx::new(), &mut |fact| {
            match fact.attribute {
                a if a == ID_TYPE => schema.value_type = fact.value.as_ref_id(),
                a if a == ID_CARDINALITY => {
                    if let Some(card) = fact.value.as_ref_id() {
                        schema.cardinality = card;
                    }
                }
                a if a == ID_UNIQUE => {
                    if let Value::Boolean(unique) = fact.value {
                        schema.unique = unique;
                    }
                }
                a if a == ID_INDEXED => {
                    if let Value::Boolean(indexed) = fact.value {
                        schema.indexed = indexed;
                    }
                }
                a if a == ID_DOC => {
                    if let Value::String(ref doc) = fact.value {
                        schema.doc = Some(doc.clone());
                    }
                }
                _ => {}
            }
            Ok(ScanControl::Continue)
        })?;

        let schema = Arc::new(schema);
        self.inner
            .lock()
            .insert(attribute, Arc::clone(&schema));
        Ok(schema)
    }
}
