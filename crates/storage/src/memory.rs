//! In-process document store
//!
//! # Design
//!
//! - DashMap of collections: collections never contend with each other
//! - BTreeMap per collection keyed by native id: `max_id` is the last key
//!   and batched lookups come back in id order
//! - Documents are stored encoded (see `StoredDoc`)
//! - Every trait call is counted in `StoreStats`
//!
//! Lookups without a sort spec return documents in ascending id order,
//! which is the order an `_id`-indexed `in` query yields.

use dashmap::DashMap;
use docmap_core::{Document, DocumentStore, Error, NativeId, Result, SortSpec};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::stats::{StatsSnapshot, StoreOp, StoreStats};
use crate::stored_doc::StoredDoc;

type Collection = BTreeMap<NativeId, StoredDoc>;

/// Thread-safe in-memory `DocumentStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
    seq: AtomicU64,
    stats: StoreStats,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the call counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero the call counters
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Every document in a collection, in id order
    ///
    /// Not part of the store contract and not counted.
    pub fn all(&self, collection: &str) -> Result<Vec<Document>> {
        match self.collections.get(collection) {
            Some(docs) => docs.values().map(StoredDoc::decode).collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Check whether an id is stored (not counted)
    pub fn contains(&self, collection: &str, id: &NativeId) -> bool {
        self.collections
            .get(collection)
            .map(|docs| docs.contains_key(id))
            .unwrap_or(false)
    }

    /// Names of collections that hold at least one document
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Drop every document in every collection
    pub fn clear(&self) {
        self.collections.clear();
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn id_of(collection: &str, doc: &Document) -> Result<NativeId> {
        doc.id()
            .and_then(NativeId::from_value)
            .ok_or_else(|| Error::MissingId(collection.to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn find_by_id(&self, collection: &str, id: &NativeId) -> Result<Option<Document>> {
        self.stats.record(StoreOp::FindById);
        match self.collections.get(collection) {
            Some(docs) => docs.get(id).map(StoredDoc::decode).transpose(),
            None => Ok(None),
        }
    }

    fn find_by_ids(
        &self,
        collection: &str,
        ids: &[NativeId],
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Document>> {
        self.stats.record(StoreOp::FindByIds);
        let wanted: BTreeSet<&NativeId> = ids.iter().collect();
        let mut found = match self.collections.get(collection) {
            Some(docs) => wanted
                .into_iter()
                .filter_map(|id| docs.get(id))
                .map(StoredDoc::decode)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        if let Some(spec) = sort {
            spec.sort(&mut found);
        }
        debug!(
            target: "docmap::store",
            collection,
            requested = ids.len(),
            found = found.len(),
            "Batched lookup"
        );
        Ok(found)
    }

    fn insert(&self, collection: &str, doc: Document) -> Result<NativeId> {
        self.stats.record(StoreOp::Insert);
        let id = Self::id_of(collection, &doc)?;
        let stored = StoredDoc::encode(&doc, self.next_seq())?;
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(Error::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        docs.insert(id.clone(), stored);
        Ok(id)
    }

    fn save(&self, collection: &str, doc: Document) -> Result<()> {
        self.stats.record(StoreOp::Save);
        let id = Self::id_of(collection, &doc)?;
        let stored = StoredDoc::encode(&doc, self.next_seq())?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, stored);
        Ok(())
    }

    fn delete_by_ids(&self, collection: &str, ids: &[NativeId]) -> Result<usize> {
        self.stats.record(StoreOp::DeleteByIds);
        let removed = match self.collections.get_mut(collection) {
            Some(mut docs) => ids.iter().filter(|id| docs.remove(*id).is_some()).count(),
            None => 0,
        };
        debug!(target: "docmap::store", collection, removed, "Deleted documents");
        Ok(removed)
    }

    fn max_id(&self, collection: &str) -> Result<Option<NativeId>> {
        self.stats.record(StoreOp::MaxId);
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.keys().next_back().cloned()))
    }

    fn count_all(&self, collection: &str) -> Result<u64> {
        self.stats.record(StoreOp::CountAll);
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }
}
