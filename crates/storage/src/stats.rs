//! Per-operation call counters
//!
//! Every `DocumentStore` method bumps its own counter, so callers can
//! assert how many round trips an operation cost (the cascade batching
//! contract is tested this way).
//!
//! # Usage
//!
//! ```ignore
//! let store = MemoryStore::new();
//! store.reset_stats();
//! mapper.fetch_cascade(&mut post, &["comments"])?;
//! assert_eq!(store.stats().find_by_ids, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a store
#[derive(Debug, Default)]
pub struct StoreStats {
    find_by_id: AtomicU64,
    find_by_ids: AtomicU64,
    insert: AtomicU64,
    save: AtomicU64,
    delete_by_ids: AtomicU64,
    max_id: AtomicU64,
    count_all: AtomicU64,
}

/// Store operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// `find_by_id`
    FindById,
    /// `find_by_ids`
    FindByIds,
    /// `insert`
    Insert,
    /// `save`
    Save,
    /// `delete_by_ids`
    DeleteByIds,
    /// `max_id`
    MaxId,
    /// `count_all`
    CountAll,
}

impl StoreStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, op: StoreOp) -> &AtomicU64 {
        match op {
            StoreOp::FindById => &self.find_by_id,
            StoreOp::FindByIds => &self.find_by_ids,
            StoreOp::Insert => &self.insert,
            StoreOp::Save => &self.save,
            StoreOp::DeleteByIds => &self.delete_by_ids,
            StoreOp::MaxId => &self.max_id,
            StoreOp::CountAll => &self.count_all,
        }
    }

    /// Count one call
    #[inline]
    pub fn record(&self, op: StoreOp) {
        self.counter(op).fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters at once
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            find_by_id: self.find_by_id.load(Ordering::Relaxed),
            find_by_ids: self.find_by_ids.load(Ordering::Relaxed),
            insert: self.insert.load(Ordering::Relaxed),
            save: self.save.load(Ordering::Relaxed),
            delete_by_ids: self.delete_by_ids.load(Ordering::Relaxed),
            max_id: self.max_id.load(Ordering::Relaxed),
            count_all: self.count_all.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for op in [
            StoreOp::FindById,
            StoreOp::FindByIds,
            StoreOp::Insert,
            StoreOp::Save,
            StoreOp::DeleteByIds,
            StoreOp::MaxId,
            StoreOp::CountAll,
        ] {
            self.counter(op).store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// `find_by_id` calls
    pub find_by_id: u64,
    /// `find_by_ids` calls
    pub find_by_ids: u64,
    /// `insert` calls
    pub insert: u64,
    /// `save` calls
    pub save: u64,
    /// `delete_by_ids` calls
    pub delete_by_ids: u64,
    /// `max_id` calls
    pub max_id: u64,
    /// `count_all` calls
    pub count_all: u64,
}

impl StatsSnapshot {
    /// Total lookups (single + batched)
    pub fn lookups(&self) -> u64 {
        self.find_by_id + self.find_by_ids
    }

    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "find_by_id: {}, find_by_ids: {}, insert: {}, save: {}, delete_by_ids: {}, max_id: {}, count_all: {}",
            self.find_by_id,
            self.find_by_ids,
            self.insert,
            self.save,
            self.delete_by_ids,
            self.max_id,
            self.count_all,
        )
    }
}
