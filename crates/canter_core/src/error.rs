//! Error types for the Canter core.

use canter_tuple::Id;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// KV backend error.
    #[error("kv backend error: {0}")]
    Kv(#[from] canter_kv::KvError),

    /// Tuple encoding error.
    #[error("tuple codec error: {0}")]
    Tuple(#[from] canter_tuple::TupleError),

    /// An ident name or ID does not exist.
    #[error("ident does not exist: {what}")]
    NoSuchIdent {
        /// The name or ID that failed to resolve.
        what: String,
    },

    /// An ident name is already bound to a different ID.
    #[error("ident already exists: {name}")]
    IdentAlreadyExists {
        /// The name that is already bound.
        name: String,
    },

    /// No entity matched a lookup or an existence check.
    #[error("no such entity")]
    NoSuchEntity,

    /// The entity has no value for the requested attribute.
    #[error("property not found")]
    PropertyNotFound,

    /// Two bindings for one temp ID resolved to different concrete IDs.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting bindings.
        message: String,
    },

    /// One or more assertions failed construction-time validation.
    ///
    /// All validation failures for a batch are collected before any backend
    /// interaction.
    #[error("invalid assertions: {}", messages.join("; "))]
    InvalidAssertions {
        /// One message per invalid assertion.
        messages: Vec<String>,
    },

    /// The referenced attribute entity carries no `db/type` fact.
    #[error("attribute entity {attribute} is not a schema entity")]
    NotSchemaEntity {
        /// The attribute that was looked up.
        attribute: Id,
    },

    /// A value's shape cannot coerce to the attribute's declared type.
    #[error("value for {type_name} attribute {attribute:?} is not assignable")]
    NotAssignable {
        /// The declared type name.
        type_name: &'static str,
        /// The attribute name.
        attribute: String,
    },

    /// A numeric value does not fit the attribute's declared type.
    #[error("value for {type_name} attribute {attribute:?} is out of range")]
    OutOfRange {
        /// The declared type name.
        type_name: &'static str,
        /// The attribute name.
        attribute: String,
    },

    /// An empty input was given where a parseable value is required.
    #[error("no input provided")]
    NoInput,

    /// A user-supplied ident name used the reserved system namespace.
    #[error("the \"db\" namespace is reserved for system identifiers")]
    ReservedNamespace {
        /// The rejected name.
        name: String,
    },

    /// A lookup was attempted on an attribute that is not unique.
    #[error("attribute {attribute:?} is not unique")]
    NotUnique {
        /// The attribute name.
        attribute: String,
    },

    /// The operation relies on a reserved, unimplemented type.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of what is unsupported.
        message: String,
    },

    /// A stored index entry could not be interpreted.
    #[error("corrupt index entry: {message}")]
    Corrupt {
        /// Description of the malformed entry.
        message: String,
    },

    /// A scan was cancelled via its stream context.
    #[error("scan cancelled")]
    Cancelled,
}

impl CoreError {
    /// Creates a no-such-ident error.
    pub fn no_such_ident(what: impl Into<String>) -> Self {
        Self::NoSuchIdent { what: what.into() }
    }

    /// Creates an ident-already-exists error.
    pub fn ident_already_exists(name: impl Into<String>) -> Self {
        Self::IdentAlreadyExists { name: name.into() }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a not-assignable coercion error.
    pub fn not_assignable(type_name: &'static str, attribute: impl Into<String>) -> Self {
        Self::NotAssignable {
            type_name,
            attribute: attribute.into(),
        }
    }

    /// Creates an out-of-range coercion error.
    pub fn out_of_range(type_name: &'static str, attribute: impl Into<String>) -> Self {
        Self::OutOfRange {
            type_name,
            attribute: attribute.into(),
        }
    }

    /// Creates an unsupported-type error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates a corrupt-entry error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}
