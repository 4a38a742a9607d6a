//! Entity snapshots and entity-shaped assertion input.

use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::id::{Id, TempId};
use crate::ident::IdentRef;
use crate::transact::{assert_fact, Assertable, Assertion, AssertValue, EntityRef};
use canter_tuple::Value;
use std::collections::BTreeMap;

/// The value an entity holds for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityValue {
    /// A cardinality/one value; the latest assertion wins.
    One(Value),
    /// A cardinality/many value list, in index scan order.
    Many(Vec<Value>),
}

impl EntityValue {
    /// Returns the single value, if this is cardinality/one.
    #[must_use]
    pub fn as_one(&self) -> Option<&Value> {
        match self {
            EntityValue::One(value) => Some(value),
            EntityValue::Many(_) => None,
        }
    }

    /// Returns the value list, if this is cardinality/many.
    #[must_use]
    pub fn as_many(&self) -> Option<&[Value]> {
        match self {
            EntityValue::One(_) => None,
            EntityValue::Many(values) => Some(values),
        }
    }
}

impl From<Value> for EntityValue {
    fn from(value: Value) -> Self {
        EntityValue::One(value)
    }
}

/// A full entity snapshot rendered with attribute names.
pub type EntitySnapshot = BTreeMap<String, EntityValue>;

/// An immutable point-in-time record of all attributes of one entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: Id,
    pub(crate) basis: Id,
    pub(crate) state: BTreeMap<Id, EntityValue>,
}

impl Entity {
    /// Returns the entity's ID.
    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the highest transaction contributing any fact to this
    /// snapshot.
    #[must_use]
    pub fn basis(&self) -> Id {
        self.basis
    }

    /// Returns the value for an attribute, which may be referenced by
    /// name, ID, or resolved ident.
    ///
    /// # Errors
    ///
    /// [`CoreError::PropertyNotFound`] if the entity holds no value for
    /// the attribute.
    pub fn get(&self, conn: &Connection, attribute: impl Into<IdentRef>) -> CoreResult<EntityValue> {
        let attr = conn.resolve_ident(attribute)?;
        self.state
            .get(&attr.id)
            .cloned()
            .ok_or(CoreError::PropertyNotFound)
    }

    /// Materializes the snapshot as a map from attribute name to value,
    /// batch-resolving all attribute idents.
    pub fn get_data(&self, conn: &Connection) -> CoreResult<EntitySnapshot> {
        let refs: Vec<IdentRef> = self.state.keys().map(|&id| IdentRef::Id(id)).collect();
        let idents = conn.resolve_idents(&refs)?;
        let mut data = EntitySnapshot::new();
        for (ident, value) in idents.into_iter().zip(self.state.values()) {
            data.insert(ident.name, value.clone());
        }
        Ok(data)
    }
}

/// Entity-shaped assertion input: an ordered mapping from attribute names
/// to values.
///
/// Two keys are special:
///
/// - `"db/id"` pins the entity to a concrete ID or temp ID and is not
///   emitted as a fact.
/// - `"db/ident"` names the entity; if the name is unknown, the resolver
///   allocates a fresh ID for it. The fact is emitted.
///
/// List values fan out into one assertion per element.
///
/// # Example
///
/// ```rust,ignore
/// conn.assert(&[&EntityData::new()
///     .with("db/ident", "person/email")
///     .with("db/type", "db.type/string")
///     .with("db/unique", true)
///     .with("db/cardinality", "db.cardinality/one")])?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityData {
    entries: Vec<(String, AssertValue)>,
}

impl EntityData {
    /// Creates empty entity data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute/value pair, preserving insertion order.
    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<AssertValue>) -> Self {
        self.entries.push((attribute.into(), value.into()));
        self
    }

    /// Picks the entity reference all emitted assertions will share.
    fn identifier(&self, conn: &Connection) -> CoreResult<EntityRef> {
        for (name, value) in &self.entries {
            if name == "db/id" {
                return match value {
                    AssertValue::Id(id) => Ok(EntityRef::Id(*id)),
                    AssertValue::Int(raw) => Ok(EntityRef::Id(Id::new(*raw))),
                    AssertValue::Temp(temp) => Ok(EntityRef::Temp(temp.clone())),
                    _ => Err(CoreError::not_assignable("ref", "db/id")),
                };
            }
        }
        for (name, value) in &self.entries {
            if name == "db/ident" {
                let ident_name = match value {
                    AssertValue::String(s) => s.as_str(),
                    AssertValue::Ident(ident) => ident.name.as_str(),
                    _ => return Err(CoreError::not_assignable("ref", "db/ident")),
                };
                return match conn.resolve_ident(ident_name) {
                    Ok(ident) => Ok(EntityRef::Id(ident.id)),
                    Err(CoreError::NoSuchIdent { .. }) => Ok(EntityRef::Temp(TempId::new())),
                    Err(err) => Err(err),
                };
            }
        }
        Ok(EntityRef::Temp(TempId::new()))
    }
}

impl Assertable for EntityData {
    fn assertions(&self, conn: &Connection) -> CoreResult<Vec<Assertion>> {
        let entity = self.identifier(conn)?;

        let mut assertions = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            if name == "db/id" {
                // Only used to match an existing entity.
                continue;
            }
            match value {
                AssertValue::List(items) => {
                    for item in items {
                        assertions.push(assert_fact(
                            entity.clone(),
                            name.as_str(),
                            item.clone(),
                        ));
                    }
                }
                other => {
                    assertions.push(assert_fact(entity.clone(), name.as_str(), other.clone()));
                }
            }
        }
        Ok(assertions)
    }
}
