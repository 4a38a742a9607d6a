//! Unique-attribute lookups.

use crate::coerce::{coerce_value, CoercedValue};
use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::id::{Id, Resolve};
use crate::stream::StreamCtx;
use crate::transact::AssertValue;

/// A `(unique attribute, value)` pair that resolves to the one entity
/// bearing that fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// The unique attribute's ident name.
    pub attribute: String,
    /// The value to probe for, in any coercible input shape.
    pub value: AssertValue,
}

impl Lookup {
    /// Creates a lookup.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<AssertValue>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

impl Resolve for Lookup {
    /// Resolves via an AVET point scan.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotUnique`] if the attribute is not declared unique;
    /// [`CoreError::NoSuchEntity`] if no entity bears the value.
    fn resolve(&self, conn: &Connection) -> CoreResult<Id> {
        let attr = conn.resolve_ident(self.attribute.as_str())?;
        let schema = conn.schema_entity(attr.id)?;
        if !schema.unique {
            return Err(CoreError::NotUnique {
                attribute: self.attribute.clone(),
            });
        }
        let value_type = schema.value_type.ok_or(CoreError::NotSchemaEntity {
            attribute: attr.id,
        })?;

        // Coerce against the declared type so the probe's encoding matches
        // the stored encoding exactly.
        let value = match coerce_value(conn, &attr, value_type, self.value.clone())? {
            CoercedValue::Value(value) => value,
            CoercedValue::Temp(_) => {
                return Err(CoreError::not_assignable("ref", self.attribute.clone()))
            }
        };

        let scan = conn.indexer().scan_avet(attr.id, &value)?;
        let facts = scan.collect(&StreamCtx::new())?;
        match facts.first() {
            Some(fact) => Ok(fact.entity),
            None => Err(CoreError::NoSuchEntity),
        }
    }
}
