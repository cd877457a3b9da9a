//! Error types for the document layer
//!
//! This module defines the errors raised by document stores and by the
//! neutral document model. Mapping-level failures live in the mapper crate
//! and wrap these.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::id::NativeId;
use thiserror::Error;

/// Result type alias for document-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the document layer
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A document with the same id already exists in the collection
    #[error("Duplicate key in collection '{collection}': {id}")]
    DuplicateKey {
        /// Collection name
        collection: String,
        /// Conflicting id
        id: NativeId,
    },

    /// A document was required but not present
    #[error("Document not found in collection '{collection}': {id}")]
    NotFound {
        /// Collection name
        collection: String,
        /// Missing id
        id: NativeId,
    },

    /// A document handed to the store carries no `_id`
    #[error("Document for collection '{0}' has no _id")]
    MissingId(String),

    /// Text that is not a valid object id
    #[error("Invalid object id '{0}'")]
    InvalidObjectId(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
