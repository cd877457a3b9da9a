//! Error types for the mapper
//!
//! Two policies coexist and are kept apart on purpose:
//! - Metadata, construction, id and cascade errors abort the operation and
//!   propagate to the caller.
//! - Field access and per-field coercion errors are local: the mapper logs
//!   them and leaves that one field out (see [`MapperError::is_field_local`]).

use thiserror::Error;

use crate::entity::FieldAccessError;

/// Result type alias for mapper operations
pub type MapperResult<T> = std::result::Result<T, MapperError>;

/// Error types for the mapper
#[derive(Debug, Error)]
pub enum MapperError {
    /// A collection-mapped type declares no identifier field
    #[error("Type '{type_name}' has no identifier field")]
    NoIdentifierField {
        /// Offending type
        type_name: String,
    },

    /// A type declares more than one identifier field
    #[error("Type '{type_name}' declares identifier fields '{first}' and '{second}'")]
    DuplicateIdentifierField {
        /// Offending type
        type_name: String,
        /// First identifier field
        first: String,
        /// Second identifier field
        second: String,
    },

    /// A field name matched neither a declared name nor a wire name
    #[error("Type '{type_name}' has no field '{field}'")]
    FieldNotFound {
        /// Type searched
        type_name: String,
        /// Name looked up
        field: String,
    },

    /// A field's declared type does not fit its role
    #[error("Field '{type_name}.{field}' has an unusable declared type: {reason}")]
    InvalidFieldType {
        /// Owning type
        type_name: String,
        /// Field name
        field: String,
        /// What is wrong
        reason: String,
    },

    /// No constructor is available for the type
    #[error("Type '{type_name}' has no usable no-argument constructor")]
    ConstructionError {
        /// Type that could not be instantiated
        type_name: String,
    },

    /// An entity's concrete type was never seen by the metadata cache
    #[error("Type '{type_name}' is not registered with the mapper")]
    UnregisteredType {
        /// Type name (or collection name for by-collection lookups)
        type_name: String,
    },

    /// An embeddable type was used where a collection is required
    #[error("Type '{type_name}' is embeddable and has no collection")]
    NotACollection {
        /// Offending type
        type_name: String,
    },

    /// A type extends itself, directly or indirectly
    #[error("Type '{type_name}' inherits from itself")]
    InheritanceCycle {
        /// Offending type
        type_name: String,
    },

    /// The user-defined id strategy was asked to encode an empty id
    #[error("Type '{type_name}' uses a user-defined id but the id is empty")]
    MissingUserDefinedId {
        /// Offending type
        type_name: String,
    },

    /// A string id could not be parsed into the native representation
    #[error("Invalid id '{id}' for type '{type_name}': {reason}")]
    InvalidIdFormat {
        /// Type whose strategy parsed the id
        type_name: String,
        /// Raw id text
        id: String,
        /// Why parsing failed
        reason: String,
    },

    /// An operation needed an entity that has no id yet
    #[error("Entity of type '{type_name}' has no id")]
    UnsavedEntity {
        /// Offending type
        type_name: String,
    },

    /// A stored reference does not use the encoding the field declares
    #[error("Reference mismatch on '{type_name}.{field}': expected {expected} reference, found {found}")]
    ReferenceMismatch {
        /// Owning type
        type_name: String,
        /// Field name
        field: String,
        /// Encoding the field declares
        expected: &'static str,
        /// Encoding found on the wire
        found: String,
    },

    /// A value could not be coerced to or from the declared type
    #[error("Type mismatch on '{type_name}.{field}': {detail}")]
    TypeMismatch {
        /// Owning type
        type_name: String,
        /// Field name
        field: String,
        /// What did not fit
        detail: String,
    },

    /// Reading or writing a field on the entity failed
    #[error("Cannot access '{type_name}.{field}': {source}")]
    FieldAccess {
        /// Owning type
        type_name: String,
        /// Field name
        field: String,
        /// Underlying access failure
        #[source]
        source: FieldAccessError,
    },

    /// A cascade path does not name a reference field
    #[error("Invalid cascade path '{path}' on '{type_name}': {reason}")]
    CascadePath {
        /// Type the path was applied to
        type_name: String,
        /// Path text
        path: String,
        /// Why it is invalid
        reason: String,
    },

    /// Cascading recursion went deeper than the configured limit
    #[error("Cascade depth limit {limit} exceeded at type '{type_name}'")]
    DepthExceeded {
        /// Type being processed when the limit hit
        type_name: String,
        /// Configured limit
        limit: usize,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the document store
    #[error(transparent)]
    Store(#[from] docmap_core::Error),
}

impl MapperError {
    /// Whether the mapper recovers from this error by skipping one field
    pub fn is_field_local(&self) -> bool {
        matches!(
            self,
            MapperError::FieldAccess { .. } | MapperError::TypeMismatch { .. }
        )
    }

    pub(crate) fn access(type_name: &str, field: &str, source: FieldAccessError) -> Self {
        MapperError::FieldAccess {
            type_name: type_name.to_string(),
            field: field.to_string(),
            source,
        }
    }

    pub(crate) fn mismatch(type_name: &str, field: &str, detail: impl Into<String>) -> Self {
        MapperError::TypeMismatch {
            type_name: type_name.to_string(),
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}
