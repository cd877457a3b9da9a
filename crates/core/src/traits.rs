//! Storage collaborator contract
//!
//! The mapper never embeds query syntax. It asks a `DocumentStore` only
//! for id-based lookups, hands it opaque documents to write, and asks for
//! the two aggregates the identifier strategies need.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (requires Send + Sync). Timeouts, if any, are the
//! store's business.

use std::sync::Arc;

use crate::error::Result;
use crate::id::NativeId;
use crate::sort::SortSpec;
use crate::value::Document;

/// Document storage abstraction consumed by the mapper
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id
    ///
    /// Returns None if no document has this id.
    fn find_by_id(&self, collection: &str, id: &NativeId) -> Result<Option<Document>>;

    /// Fetch every document whose id is in `ids`, in one round trip
    ///
    /// Ids with no matching document are silently skipped, so the result
    /// may be shorter than `ids`. With a sort spec the result follows it;
    /// without one the order is the store's own.
    fn find_by_ids(
        &self,
        collection: &str,
        ids: &[NativeId],
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Document>>;

    /// Insert a new document, failing if its `_id` already exists
    ///
    /// Returns the id the document was stored under.
    fn insert(&self, collection: &str, doc: Document) -> Result<NativeId>;

    /// Insert or replace a document by its `_id`
    fn save(&self, collection: &str, doc: Document) -> Result<()>;

    /// Delete every document whose id is in `ids`
    ///
    /// Returns the number of documents removed.
    fn delete_by_ids(&self, collection: &str, ids: &[NativeId]) -> Result<usize>;

    /// Largest id currently stored in the collection
    fn max_id(&self, collection: &str) -> Result<Option<NativeId>>;

    /// Number of documents in the collection
    fn count_all(&self, collection: &str) -> Result<u64>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn find_by_id(&self, collection: &str, id: &NativeId) -> Result<Option<Document>> {
        (**self).find_by_id(collection, id)
    }

    fn find_by_ids(
        &self,
        collection: &str,
        ids: &[NativeId],
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Document>> {
        (**self).find_by_ids(collection, ids, sort)
    }

    fn insert(&self, collection: &str, doc: Document) -> Result<NativeId> {
        (**self).insert(collection, doc)
    }

    fn save(&self, collection: &str, doc: Document) -> Result<()> {
        (**self).save(collection, doc)
    }

    fn delete_by_ids(&self, collection: &str, ids: &[NativeId]) -> Result<usize> {
        (**self).delete_by_ids(collection, ids)
    }

    fn max_id(&self, collection: &str) -> Result<Option<NativeId>> {
        (**self).max_id(collection)
    }

    fn count_all(&self, collection: &str) -> Result<u64> {
        (**self).count_all(collection)
    }
}
