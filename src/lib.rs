//! docmap - entity/document mapping engine
//!
//! docmap converts application entities to and from neutral documents,
//! resolves references between collections with batched lookups, and
//! assigns identifiers with one of three strategies.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmap::{EntityMapper, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mapper = EntityMapper::new(store);
//!
//! let mut book = Book::titled("Dune");
//! let id = mapper.insert(&mut book)?;
//! let again: Option<Book> = mapper.find_by_id(&id.to_string())?;
//! ```
//!
//! # Architecture
//!
//! - [`docmap_core`]: `Value`, `Document`, ids, `DbRef`, `SortSpec` and the
//!   `DocumentStore` contract
//! - [`docmap_storage`]: the in-process `MemoryStore`
//! - [`docmap_mapper`]: metadata, codecs, id strategies, references,
//!   cascades, hooks and the [`EntityMapper`] facade

pub use docmap_core::{
    DbRef, Document, DocumentStore, NativeId, ObjectId, SortOrder, SortSpec, Value, ID_KEY,
};
pub use docmap_mapper::*;
pub use docmap_storage::{MemoryStore, StatsSnapshot, StoreOp};

/// Storage-level error type, re-exported under a distinct name
pub use docmap_core::Error as StoreError;
