//! The connection: ident resolution, the transaction pipeline, and entity
//! reads.

use crate::coerce::{coerce_value, CoercedValue};
use crate::entity::{Entity, EntityValue};
use crate::error::{CoreError, CoreResult};
use crate::fact::{AssertMode, Fact, ResolvedAssertion};
use crate::id::{
    Id, IdSource, Resolve, TempId, ID_CARDINALITY_MANY, ID_ID, ID_IDENT, UNRESOLVED_ID,
};
use crate::ident::{guard_reserved_name, Ident, IdentCache, IdentRef, IdentStore};
use crate::index::Indexer;
use crate::lookup::Lookup;
use crate::schema::{AttributeSchema, SchemaCache};
use crate::stream::{ScanControl, StreamCtx};
use crate::transact::{Assertable, Assertion, AssertValue, AttrRef, EntityRef};
use canter_tuple::Value;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// The reserved temp-ID symbol bound to the transaction entity.
const TXID_SYMBOL: &str = "txid";

/// The storage capabilities a connection consumes.
///
/// All three handles are usually one [`crate::KvStore`] shared behind
/// `Arc`s; see [`Config::from_store`].
pub struct Config {
    /// Persistent ident table.
    pub ident_store: Arc<dyn IdentStore>,
    /// Monotonic ID allocator.
    pub id_source: Arc<dyn IdSource>,
    /// Index writer and scanner.
    pub indexer: Arc<dyn Indexer>,
}

impl Config {
    /// Creates a config from explicit capability handles.
    #[must_use]
    pub fn new(
        ident_store: Arc<dyn IdentStore>,
        id_source: Arc<dyn IdSource>,
        indexer: Arc<dyn Indexer>,
    ) -> Self {
        Self {
            ident_store,
            id_source,
            indexer,
        }
    }

    /// Creates a config whose three capabilities are all served by one
    /// KV-backed store.
    #[must_use]
    pub fn from_store(store: Arc<crate::KvStore>) -> Self {
        Self {
            ident_store: Arc::clone(&store) as Arc<dyn IdentStore>,
            id_source: Arc::clone(&store) as Arc<dyn IdSource>,
            indexer: store as Arc<dyn Indexer>,
        }
    }
}

/// Opens a connection over the given backends.
#[must_use]
pub fn connect(config: Config) -> Connection {
    Connection::connect(config)
}

/// A database value: the basis transaction a set of reads is consistent
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Database {
    /// The latest transaction reflected in this value.
    pub basis: Id,
}

/// The temp-ID bindings produced by one transaction.
#[derive(Debug, Clone, Default)]
pub struct TempIds {
    bindings: HashMap<String, Id>,
}

impl TempIds {
    /// Returns the concrete ID a temp ID resolved to.
    #[must_use]
    pub fn lookup(&self, temp: &TempId) -> Option<Id> {
        self.bindings
            .get(temp.symbol())
            .copied()
            .filter(|id| !id.is_unresolved())
    }

    /// Returns the number of bindings, including the transaction's own.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no temp IDs were bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The outcome of a successful transaction.
#[derive(Debug)]
pub struct AssertResult {
    /// The database value whose basis is the written transaction.
    pub db: Database,
    /// Every fact written, in submission order (the injected commit-time
    /// fact last).
    pub data: Vec<ResolvedAssertion>,
    /// Temp-ID bindings, including the reserved transaction binding.
    pub temp_ids: TempIds,
}

/// A handle to one Canter database.
///
/// The connection owns the ident cache and schema cache, resolves
/// transactions one at a time, and serves point-in-time entity reads.
/// Reads may proceed concurrently with each other; the resolver is not
/// re-entrant.
pub struct Connection {
    ident_store: Arc<dyn IdentStore>,
    ident_cache: IdentCache,
    schema_cache: SchemaCache,
    id_source: Arc<dyn IdSource>,
    indexer: Arc<dyn Indexer>,
}

impl Connection {
    /// Opens a connection and hydrates the ident cache.
    ///
    /// Hydration failure degrades to on-demand backend lookups; resolution
    /// correctness never depends on the preload.
    #[must_use]
    pub fn connect(config: Config) -> Self {
        let conn = Self {
            ident_store: config.ident_store,
            ident_cache: IdentCache::new(),
            schema_cache: SchemaCache::new(),
            id_source: config.id_source,
            indexer: config.indexer,
        };
        match conn.ident_store.load_idents() {
            Ok(idents) => {
                debug!(count = idents.len(), "hydrated ident cache");
                conn.ident_cache.store(&idents);
            }
            Err(err) => {
                warn!(error = %err, "ident cache hydration failed; using on-demand lookups");
            }
        }
        conn
    }

    /// Resolves a batch of heterogeneous ident references.
    ///
    /// The output is element-wise parallel to the input. This method never
    /// allocates new idents; unknown names and IDs are an error. Names in
    /// the reserved `"db/"` namespace that are not known system idents are
    /// rejected.
    pub fn resolve_idents(&self, refs: &[IdentRef]) -> CoreResult<Vec<Ident>> {
        let mut out: Vec<Option<Ident>> = vec![None; refs.len()];
        let mut unresolved_names: Vec<String> = Vec::new();
        let mut name_indexes: Vec<usize> = Vec::new();
        let mut unresolved_ids: Vec<Id> = Vec::new();
        let mut id_indexes: Vec<usize> = Vec::new();

        for (idx, ident_ref) in refs.iter().enumerate() {
            match ident_ref {
                IdentRef::Ident(ident) => out[idx] = Some(ident.clone()),
                IdentRef::Id(id) => match self.ident_cache.lookup_by_id(*id) {
                    Some(ident) => out[idx] = Some(ident),
                    None => {
                        unresolved_ids.push(*id);
                        id_indexes.push(idx);
                    }
                },
                IdentRef::Name(name) => match self.ident_cache.lookup_by_name(name) {
                    Some(ident) => out[idx] = Some(ident),
                    None => {
                        guard_reserved_name(name)?;
                        unresolved_names.push(name.clone());
                        name_indexes.push(idx);
                    }
                },
            }
        }

        if !unresolved_names.is_empty() {
            let name_refs: Vec<&str> = unresolved_names.iter().map(String::as_str).collect();
            let ids = self.ident_store.lookup_ident_ids(&name_refs)?;
            let mut fresh = Vec::with_capacity(ids.len());
            for (idx, id) in ids.into_iter().enumerate() {
                let ident = Ident::new(id, unresolved_names[idx].clone());
                out[name_indexes[idx]] = Some(ident.clone());
                fresh.push(ident);
            }
            self.ident_cache.store(&fresh);
        }

        if !unresolved_ids.is_empty() {
            let names = self.ident_store.lookup_ident_names(&unresolved_ids)?;
            let mut fresh = Vec::with_capacity(names.len());
            for (idx, name) in names.into_iter().enumerate() {
                let ident = Ident::new(unresolved_ids[idx], name);
                out[id_indexes[idx]] = Some(ident.clone());
                fresh.push(ident);
            }
            self.ident_cache.store(&fresh);
        }

        Ok(out
            .into_iter()
            .map(|ident| ident.expect("every input resolved or errored"))
            .collect())
    }

    /// Resolves a single ident reference.
    pub fn resolve_ident(&self, ident_ref: impl Into<IdentRef>) -> CoreResult<Ident> {
        let idents = self.resolve_idents(&[ident_ref.into()])?;
        Ok(idents.into_iter().next().expect("one input, one output"))
    }

    /// Submits a transaction.
    ///
    /// Expands the assertables, resolves attributes and entity references,
    /// coerces values against declared types, allocates IDs for remaining
    /// temp IDs, and commits the resolved batch atomically. Either every
    /// fact is written or none is.
    pub fn assert(&self, assertables: &[&dyn Assertable]) -> CoreResult<AssertResult> {
        // Pass 1: expand and validate. All validation failures are
        // reported together, before any backend interaction.
        let mut assertions: Vec<Assertion> = Vec::new();
        for assertable in assertables {
            assertions.extend(assertable.assertions(self)?);
        }
        let messages: Vec<String> = assertions
            .iter()
            .filter_map(Assertion::validation_error)
            .collect();
        if !messages.is_empty() {
            return Err(CoreError::InvalidAssertions { messages });
        }

        // Pass 2: inject the transaction entity's commit-time fact under
        // the reserved temp-ID symbol.
        let mut temp_ids: HashMap<String, Id> = HashMap::new();
        temp_ids.insert(TXID_SYMBOL.to_string(), UNRESOLVED_ID);
        assertions.push(Assertion::new(
            EntityRef::Temp(TempId::with_symbol(TXID_SYMBOL)),
            AttrRef::Name("db.tx/commitTime".to_string()),
            AssertValue::Timestamp(Utc::now()),
            AssertMode::Addition,
        ));

        // Pass 3: resolve attributes, coerce values.
        let mut working: Vec<WorkingAssertion> = Vec::with_capacity(assertions.len());
        for assertion in assertions {
            let Assertion {
                entity,
                attribute,
                value,
                mode,
            } = assertion;

            let attr = self.resolve_ident(attribute_ident_ref(attribute))?;

            if attr.id == ID_ID {
                // db/id carries an entity reference consumed by pass 4,
                // not a value of the attribute's declared scalar type.
                let value = coerce_db_id_value(&attr, value)?;
                working.push(WorkingAssertion {
                    entity,
                    attr,
                    schema: None,
                    value,
                    mode,
                });
                continue;
            }

            let schema = self.schema_entity(attr.id)?;
            let value_type = schema.value_type.ok_or(CoreError::NotSchemaEntity {
                attribute: attr.id,
            })?;
            let value = coerce_value(self, &attr, value_type, value)?;
            if let CoercedValue::Temp(temp) = &value {
                temp_ids
                    .entry(temp.symbol().to_string())
                    .or_insert(UNRESOLVED_ID);
            }
            working.push(WorkingAssertion {
                entity,
                attr,
                schema: Some(schema),
                value,
                mode,
            });
        }

        // Pass 4: resolve entity references to concrete or tentative IDs.
        // Unique-attribute probes are tracked per symbol: a temp ID whose
        // unique attributes partly resolve to an existing entity and
        // partly to nothing identifies two different entities at once, and
        // the transaction must fail rather than silently re-key the
        // existing one.
        let mut unique_hits: HashMap<String, Id> = HashMap::new();
        let mut unique_misses: HashMap<String, Vec<String>> = HashMap::new();
        for work in &mut working {
            let temp = match &work.entity {
                EntityRef::Id(_) => continue,
                EntityRef::Name(name) => {
                    let ident = self.resolve_ident(name.as_str())?;
                    work.entity = EntityRef::Id(ident.id);
                    continue;
                }
                EntityRef::Temp(temp) => temp.clone(),
            };

            if work.attr.id == ID_ID {
                // Pin to an existing entity.
                let target = ref_value(&work.value, &work.attr)?;
                let facts = self
                    .indexer
                    .scan_eavt(target, None)?
                    .collect(&StreamCtx::new())?;
                if facts.is_empty() {
                    return Err(CoreError::NoSuchEntity);
                }
                bind_temp_id(&mut temp_ids, temp.symbol(), target, "db/id")?;
            } else if work.attr.id == ID_IDENT {
                // The value position already resolved (or allocated) the
                // ident's ID in pass 3.
                let id = ref_value(&work.value, &work.attr)?;
                bind_temp_id(&mut temp_ids, temp.symbol(), id, "db/ident")?;
            } else {
                let unique = work
                    .schema
                    .as_ref()
                    .is_some_and(|schema| schema.unique);
                if unique {
                    if let CoercedValue::Value(value) = &work.value {
                        let lookup =
                            Lookup::new(work.attr.name.clone(), AssertValue::from(value.clone()));
                        match lookup.resolve(self) {
                            Ok(id) => {
                                bind_temp_id(&mut temp_ids, temp.symbol(), id, &work.attr.name)?;
                                unique_hits.insert(temp.symbol().to_string(), id);
                            }
                            Err(CoreError::NoSuchEntity) => {
                                // No existing entity bears the value.
                                unique_misses
                                    .entry(temp.symbol().to_string())
                                    .or_default()
                                    .push(work.attr.name.clone());
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
                temp_ids
                    .entry(temp.symbol().to_string())
                    .or_insert(UNRESOLVED_ID);
            }
        }

        for (symbol, attrs) in &unique_misses {
            if let Some(hit) = unique_hits.get(symbol) {
                return Err(CoreError::conflict(format!(
                    "temp id {symbol:?} resolved to {hit} by a unique attribute, but unique \
                     attribute(s) {attrs:?} matched no entity"
                )));
            }
        }

        // Pass 5: allocate IDs for every still-unresolved temp ID.
        for id in temp_ids.values_mut() {
            if !id.is_unresolved() {
                continue;
            }
            let mut fresh = UNRESOLVED_ID;
            while fresh.is_unresolved() {
                fresh = self.id_source.next_id()?;
            }
            *id = fresh;
        }

        // Pass 6: replace temp IDs with their final IDs and materialize.
        let tx = temp_ids[TXID_SYMBOL];
        let mut resolved = Vec::with_capacity(working.len());
        for work in working {
            let entity = match work.entity {
                EntityRef::Id(id) => id,
                EntityRef::Temp(temp) => temp_ids[temp.symbol()],
                EntityRef::Name(_) => unreachable!("names resolve in pass 4"),
            };
            let value = match work.value {
                CoercedValue::Value(value) => value,
                CoercedValue::Temp(temp) => Value::Ref(temp_ids[temp.symbol()]),
            };
            resolved.push(ResolvedAssertion::new(
                Fact {
                    entity,
                    attribute: work.attr.id,
                    value,
                    tx,
                },
                work.mode,
            ));
        }

        // Pass 7: write.
        self.write_resolved(resolved, TempIds { bindings: temp_ids })
    }

    /// Commits an already-resolved batch. Used by the normal pipeline and
    /// by bootstrap, which cannot go through resolution before any schema
    /// exists.
    pub(crate) fn write_resolved(
        &self,
        assertions: Vec<ResolvedAssertion>,
        temp_ids: TempIds,
    ) -> CoreResult<AssertResult> {
        self.indexer.write(&assertions)?;
        let basis = assertions
            .last()
            .map(|assertion| assertion.fact.tx)
            .unwrap_or(UNRESOLVED_ID);
        Ok(AssertResult {
            db: Database { basis },
            data: assertions,
            temp_ids,
        })
    }

    /// Materializes the point-in-time state of one entity.
    ///
    /// Folds an EAVT scan using each attribute's cardinality: the highest
    /// transaction wins for cardinality/one, values accumulate in scan
    /// order for cardinality/many.
    pub fn get_entity(&self, resolver: &dyn Resolve) -> CoreResult<Entity> {
        let eid = resolver.resolve(self)?;
        let scan = self.indexer.scan_eavt(eid, None)?;

        let mut state: BTreeMap<Id, EntityValue> = BTreeMap::new();
        let mut one_basis: HashMap<Id, Id> = HashMap::new();
        let mut basis = UNRESOLVED_ID;
        scan.produce(&StreamCtx::new(), &mut |fact| {
            let schema = self.schema_entity(fact.attribute)?;
            if schema.cardinality == ID_CARDINALITY_MANY {
                match state
                    .entry(fact.attribute)
                    .or_insert_with(|| EntityValue::Many(Vec::new()))
                {
                    EntityValue::Many(values) => values.push(fact.value.clone()),
                    other => *other = EntityValue::Many(vec![fact.value.clone()]),
                }
            } else {
                let seen_tx = one_basis.entry(fact.attribute).or_insert(UNRESOLVED_ID);
                if fact.tx >= *seen_tx {
                    *seen_tx = fact.tx;
                    state.insert(fact.attribute, EntityValue::One(fact.value.clone()));
                }
            }
            if fact.tx > basis {
                basis = fact.tx;
            }
            Ok(ScanControl::Continue)
        })?;

        Ok(Entity {
            id: eid,
            basis,
            state,
        })
    }

    /// Reads an attribute's schema entity through the non-recursive cached
    /// path.
    pub(crate) fn schema_entity(&self, attribute: Id) -> CoreResult<Arc<AttributeSchema>> {
        self.schema_cache.get(self.indexer.as_ref(), attribute)
    }

    pub(crate) fn indexer(&self) -> &dyn Indexer {
        self.indexer.as_ref()
    }

    pub(crate) fn id_source(&self) -> &dyn IdSource {
        self.id_source.as_ref()
    }

    /// Allocates an ID for a new ident name and stores the binding
    /// immediately, so later resolutions within the same transaction see
    /// it.
    pub(crate) fn allocate_ident(&self, name: &str) -> CoreResult<Id> {
        let id = self.id_source.next_id()?;
        let ident = Ident::new(id, name);
        self.ident_store.store_ident(&ident)?;
        self.ident_cache.store(std::slice::from_ref(&ident));
        debug!(%ident, "allocated ident");
        Ok(id)
    }
}

/// The state of one assertion between resolution passes.
struct WorkingAssertion {
    entity: EntityRef,
    attr: Ident,
    /// Absent only for the `db/id` pseudo-attribute.
    schema: Option<Arc<AttributeSchema>>,
    value: CoercedValue,
    mode: AssertMode,
}

fn attribute_ident_ref(attribute: AttrRef) -> IdentRef {
    match attribute {
        AttrRef::Name(name) => IdentRef::Name(name),
        AttrRef::Ident(ident) => IdentRef::Ident(ident),
        AttrRef::Id(id) => IdentRef::Id(id),
    }
}

fn coerce_db_id_value(attr: &Ident, value: AssertValue) -> CoreResult<CoercedValue> {
    match value {
        AssertValue::Id(id) => Ok(CoercedValue::Value(Value::Ref(id))),
        AssertValue::Int(raw) => Ok(CoercedValue::Value(Value::Ref(Id::new(raw)))),
        AssertValue::UInt(raw) => {
            let raw =
                i64::try_from(raw).map_err(|_| CoreError::out_of_range("ref", attr.name.clone()))?;
            Ok(CoercedValue::Value(Value::Ref(Id::new(raw))))
        }
        _ => Err(CoreError::not_assignable("ref", attr.name.clone())),
    }
}

fn ref_value(value: &CoercedValue, attr: &Ident) -> CoreResult<Id> {
    match value {
        CoercedValue::Value(Value::Ref(id)) => Ok(*id),
        _ => Err(CoreError::not_assignable("ref", attr.name.clone())),
    }
}

fn bind_temp_id(
    temp_ids: &mut HashMap<String, Id>,
    symbol: &str,
    id: Id,
    context: &str,
) -> CoreResult<()> {
    if let Some(&existing) = temp_ids.get(symbol) {
        if !existing.is_unresolved() && existing != id {
            return Err(CoreError::conflict(format!(
                "{context} binds temp id {symbol:?} to {id}, but it already resolved to {existing}"
            )));
        }
    }
    temp_ids.insert(symbol.to_string(), id);
    Ok(())
}
