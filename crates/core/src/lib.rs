//! Core types and traits for docmap
//!
//! This crate defines the neutral document model shared by the mapper and
//! every store:
//! - Value: wire value enum (scalars, arrays, nested documents, references)
//! - Document: ordered field map, the unit of storage
//! - ObjectId / NativeId: generated and native identifier forms
//! - DbRef: self-describing collection + id reference
//! - SortSpec: ordering for batched lookups
//! - Error: document-layer error type
//! - DocumentStore: the storage collaborator contract

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod reference;
pub mod sort;
pub mod traits;
pub mod value;

pub use error::{Error, Result};
pub use id::{NativeId, ObjectId};
pub use reference::DbRef;
pub use sort::{SortOrder, SortSpec};
pub use traits::DocumentStore;
pub use value::{Document, Value, ID_KEY};
