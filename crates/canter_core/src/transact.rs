//! Assertables: the unresolved inputs to a transaction.

use crate::connection::Connection;
use crate::error::CoreResult;
use crate::fact::AssertMode;
use crate::id::{Id, TempId};
use crate::ident::Ident;
use crate::lookup::Lookup;
use chrono::{DateTime, NaiveDate, Utc};
use canter_tuple::Value;
use ulid::Ulid;
use uuid::Uuid;

/// Something that expands into assertions for submission.
///
/// Implementations flatten themselves into [`Assertion`]s without resolving
/// any IDs; resolution happens inside the connection while preparing the
/// transaction.
pub trait Assertable {
    /// Returns the assertions this item contributes.
    fn assertions(&self, conn: &Connection) -> CoreResult<Vec<Assertion>>;
}

/// An unresolved reference to the entity an assertion is about.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    /// A concrete entity ID.
    Id(Id),
    /// A transaction-scoped placeholder.
    Temp(TempId),
    /// An ident name to resolve.
    Name(String),
}

impl From<Id> for EntityRef {
    fn from(id: Id) -> Self {
        EntityRef::Id(id)
    }
}

impl From<TempId> for EntityRef {
    fn from(temp: TempId) -> Self {
        EntityRef::Temp(temp)
    }
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        EntityRef::Name(name.to_string())
    }
}

/// An unresolved reference to an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrRef {
    /// An ident name to resolve.
    Name(String),
    /// An already-resolved ident.
    Ident(Ident),
    /// A concrete attribute ID.
    Id(Id),
}

impl From<&str> for AttrRef {
    fn from(name: &str) -> Self {
        AttrRef::Name(name.to_string())
    }
}

impl From<Ident> for AttrRef {
    fn from(ident: Ident) -> Self {
        AttrRef::Ident(ident)
    }
}

impl From<Id> for AttrRef {
    fn from(id: Id) -> Self {
        AttrRef::Id(id)
    }
}

/// A value as supplied by the caller, before type coercion.
///
/// The resolver coerces each shape against the attribute's declared
/// `db/type`; see the connection's transaction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum AssertValue {
    /// A concrete entity ID (for ref attributes).
    Id(Id),
    /// A placeholder resolving within the transaction (for ref attributes).
    Temp(TempId),
    /// An ident, resolved by name if needed (for ref attributes).
    Ident(Ident),
    /// A unique-attribute lookup (for ref attributes).
    Lookup(Box<Lookup>),
    /// A string.
    String(String),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A signed integer of any width.
    Int(i64),
    /// An unsigned integer of any width.
    UInt(u64),
    /// A 64-bit float.
    Float(f64),
    /// A 32-bit float.
    Float32(f32),
    /// A boolean.
    Bool(bool),
    /// An absolute instant.
    Timestamp(DateTime<Utc>),
    /// A calendar date.
    Date(NaiveDate),
    /// A UUID.
    Uuid(Uuid),
    /// A ULID.
    Ulid(Ulid),
    /// An ordered multi-value; only valid inside entity data, where it fans
    /// out into one assertion per element.
    List(Vec<AssertValue>),
}

impl From<Id> for AssertValue {
    fn from(id: Id) -> Self {
        AssertValue::Id(id)
    }
}

impl From<TempId> for AssertValue {
    fn from(temp: TempId) -> Self {
        AssertValue::Temp(temp)
    }
}

impl From<Ident> for AssertValue {
    fn from(ident: Ident) -> Self {
        AssertValue::Ident(ident)
    }
}

impl From<Lookup> for AssertValue {
    fn from(lookup: Lookup) -> Self {
        AssertValue::Lookup(Box::new(lookup))
    }
}

impl From<&str> for AssertValue {
    fn from(s: &str) -> Self {
        AssertValue::String(s.to_string())
    }
}

impl From<String> for AssertValue {
    fn from(s: String) -> Self {
        AssertValue::String(s)
    }
}

impl From<i64> for AssertValue {
    fn from(n: i64) -> Self {
        AssertValue::Int(n)
    }
}

impl From<i32> for AssertValue {
    fn from(n: i32) -> Self {
        AssertValue::Int(n.into())
    }
}

impl From<u64> for AssertValue {
    fn from(n: u64) -> Self {
        AssertValue::UInt(n)
    }
}

impl From<f64> for AssertValue {
    fn from(v: f64) -> Self {
        AssertValue::Float(v)
    }
}

impl From<bool> for AssertValue {
    fn from(b: bool) -> Self {
        AssertValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for AssertValue {
    fn from(t: DateTime<Utc>) -> Self {
        AssertValue::Timestamp(t)
    }
}

impl From<NaiveDate> for AssertValue {
    fn from(d: NaiveDate) -> Self {
        AssertValue::Date(d)
    }
}

impl From<Uuid> for AssertValue {
    fn from(u: Uuid) -> Self {
        AssertValue::Uuid(u)
    }
}

impl From<Ulid> for AssertValue {
    fn from(u: Ulid) -> Self {
        AssertValue::Ulid(u)
    }
}

impl From<Vec<AssertValue>> for AssertValue {
    fn from(items: Vec<AssertValue>) -> Self {
        AssertValue::List(items)
    }
}

/// Turns a stored [`Value`] back into an input shape, for re-coercion.
impl From<Value> for AssertValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Ref(id) => AssertValue::Id(id),
            Value::String(s) => AssertValue::String(s),
            Value::Boolean(b) => AssertValue::Bool(b),
            Value::Int64(n) => AssertValue::Int(n),
            Value::Int32(n) => AssertValue::Int(n.into()),
            Value::Int16(n) => AssertValue::Int(n.into()),
            Value::Int8(n) => AssertValue::Int(n.into()),
            Value::Float64(v) => AssertValue::Float(v),
            Value::Float32(v) => AssertValue::Float32(v),
            Value::Timestamp(t) => AssertValue::Timestamp(t),
            Value::Date(d) => AssertValue::Date(d),
            Value::Binary(b) => AssertValue::Bytes(b),
            Value::Uuid(u) => AssertValue::Uuid(u),
            Value::Ulid(u) => AssertValue::Ulid(u),
        }
    }
}

/// An action (add/retract/redact) over an unresolved (entity, attribute,
/// value) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub(crate) entity: EntityRef,
    pub(crate) attribute: AttrRef,
    pub(crate) value: AssertValue,
    pub(crate) mode: AssertMode,
}

impl Assertion {
    pub(crate) fn new(
        entity: EntityRef,
        attribute: AttrRef,
        value: AssertValue,
        mode: AssertMode,
    ) -> Self {
        Self {
            entity,
            attribute,
            value,
            mode,
        }
    }

    /// Returns a description of why this assertion is malformed, if it is.
    ///
    /// All failures in a batch are collected and reported together before
    /// any backend interaction.
    pub(crate) fn validation_error(&self) -> Option<String> {
        if let EntityRef::Name(name) = &self.entity {
            if name.is_empty() {
                return Some("entity ident name is empty".to_string());
            }
        }
        match &self.attribute {
            AttrRef::Name(name) if name.is_empty() => {
                return Some("attribute name is empty".to_string());
            }
            AttrRef::Ident(ident) if ident.name.is_empty() && ident.id.is_unresolved() => {
                return Some("attribute ident is empty".to_string());
            }
            _ => {}
        }
        if matches!(self.value, AssertValue::List(_)) {
            return Some(format!(
                "multi-valued assertion for attribute {:?} must go through entity data",
                self.attribute_label()
            ));
        }
        None
    }

    fn attribute_label(&self) -> String {
        match &self.attribute {
            AttrRef::Name(name) => name.clone(),
            AttrRef::Ident(ident) => ident.name.clone(),
            AttrRef::Id(id) => id.to_string(),
        }
    }
}

impl Assertable for Assertion {
    fn assertions(&self, _conn: &Connection) -> CoreResult<Vec<Assertion>> {
        Ok(vec![self.clone()])
    }
}

/// Builds an addition assertion.
pub fn assert_fact(
    entity: impl Into<EntityRef>,
    attribute: impl Into<AttrRef>,
    value: impl Into<AssertValue>,
) -> Assertion {
    Assertion::new(
        entity.into(),
        attribute.into(),
        value.into(),
        AssertMode::Addition,
    )
}

/// Builds a retraction assertion.
pub fn retract_fact(
    entity: impl Into<EntityRef>,
    attribute: impl Into<AttrRef>,
    value: impl Into<AssertValue>,
) -> Assertion {
    Assertion::new(
        entity.into(),
        attribute.into(),
        value.into(),
        AssertMode::Retraction,
    )
}

/// Builds a redaction assertion.
pub fn redact_fact(
    entity: impl Into<EntityRef>,
    attribute: impl Into<AttrRef>,
    value: impl Into<AssertValue>,
) -> Assertion {
    Assertion::new(
        entity.into(),
        attribute.into(),
        value.into(),
        AssertMode::Redaction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_fact_builds_addition() {
        let a = assert_fact(Id::new(5), "person/email", "a@x");
        assert_eq!(a.mode, AssertMode::Addition);
        assert_eq!(a.entity, EntityRef::Id(Id::new(5)));
        assert_eq!(a.attribute, AttrRef::Name("person/email".to_string()));
        assert!(a.validation_error().is_none());
    }

    #[test]
    fn retract_fact_builds_retraction() {
        let a = retract_fact(Id::new(5), "person/email", "a@x");
        assert_eq!(a.mode, AssertMode::Retraction);
    }

    #[test]
    fn empty_attribute_name_fails_validation() {
        let a = assert_fact(Id::new(5), "", true);
        assert!(a.validation_error().is_some());
    }

    #[test]
    fn empty_entity_name_fails_validation() {
        let a = assert_fact("", "db/doc", "text");
        assert!(a.validation_error().is_some());
    }

    #[test]
    fn direct_list_value_fails_validation() {
        let a = assert_fact(
            Id::new(5),
            "person/pets",
            AssertValue::List(vec![AssertValue::Int(1)]),
        );
        assert!(a.validation_error().is_some());
    }

    #[test]
    fn temp_id_entity_is_valid() {
        let a = assert_fact(TempId::new(), "person/email", "a@x");
        assert!(a.validation_error().is_none());
    }
}
