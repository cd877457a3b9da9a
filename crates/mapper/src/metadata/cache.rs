//! Type metadata cache
//!
//! Builds each type's [`EntityType`] on first access and keeps it keyed by
//! `TypeId`. Builds run outside any map lock, so concurrent first access to
//! the same type may build twice; the last insert wins and every reader
//! gets a complete entry either way.
//!
//! Entries live in an [`LruCache`]: with a capacity, the least recently
//! used entry is evicted when the cache grows past it, and evicted types
//! are rebuilt on next access. The
//! handle and collection registries are never evicted, so a type seen once
//! can always be found again by `TypeId` or collection name.

use std::any::TypeId;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::descriptor::FieldDescriptor;
use super::entity_type::EntityType;
use crate::entity::TypeHandle;
use crate::error::{MapperError, MapperResult};

/// Counters for cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Metadata builds (first access, races and rebuilds)
    pub builds: u64,
    /// Entries evicted by the LRU policy
    pub evictions: u64,
}

/// Memoizing registry of entity metadata
pub struct TypeMetadataCache {
    entries: Mutex<LruCache<TypeId, Arc<EntityType>>>,
    handles: DashMap<TypeId, TypeHandle>,
    by_collection: DashMap<String, TypeHandle>,
    capacity: usize,
    hits: AtomicU64,
    builds: AtomicU64,
    evictions: AtomicU64,
}

impl TypeMetadataCache {
    /// Create a cache; `capacity == 0` means unbounded
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(bound) => LruCache::new(bound),
            None => LruCache::unbounded(),
        };
        TypeMetadataCache {
            entries: Mutex::new(entries),
            handles: DashMap::new(),
            by_collection: DashMap::new(),
            capacity,
            hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Metadata for `handle`, building it on first access
    pub fn get(&self, handle: TypeHandle) -> MapperResult<Arc<EntityType>> {
        if let Some(ty) = self.entries.lock().get(&handle.type_id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(ty));
        }

        let ty = Arc::new(EntityType::build(handle)?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "docmap::metadata",
            type_name = ty.type_name(),
            collection = ?ty.collection_name(),
            fields = ty.fields().len(),
            "Built entity metadata"
        );

        self.remember(&ty);
        let displaced = self.entries.lock().push(handle.type_id(), Arc::clone(&ty));
        if let Some((type_id, evicted)) = displaced {
            // A racing build of the same type replaces, it does not evict
            if type_id != handle.type_id() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: "docmap::metadata",
                    type_name = evicted.type_name(),
                    "Evicted entity metadata"
                );
            }
        }
        Ok(ty)
    }

    /// Metadata for a type known only by `TypeId`
    ///
    /// The type must have been reached before, directly or as the target
    /// of an embedded or reference field of a type that was.
    pub fn get_by_type_id(&self, type_id: TypeId, type_name: &str) -> MapperResult<Arc<EntityType>> {
        let handle = self.handle_of(type_id).ok_or_else(|| MapperError::UnregisteredType {
            type_name: type_name.to_string(),
        })?;
        self.get(handle)
    }

    /// Handle registered for `type_id`
    pub fn handle_of(&self, type_id: TypeId) -> Option<TypeHandle> {
        self.handles.get(&type_id).map(|h| *h)
    }

    /// Type stored in `collection`
    ///
    /// Falls back to building every known handle that has not been built
    /// yet, since targets are registered before their metadata exists.
    pub fn by_collection(&self, collection: &str) -> MapperResult<Option<TypeHandle>> {
        if let Some(handle) = self.by_collection.get(collection).map(|h| *h) {
            return Ok(Some(handle));
        }
        let known: Vec<TypeHandle> = self.handles.iter().map(|h| *h.value()).collect();
        for handle in known {
            let ty = self.get(handle)?;
            if ty.collection_name() == Some(collection) {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    /// All fields of a type
    pub fn fields(&self, handle: TypeHandle) -> MapperResult<Vec<FieldDescriptor>> {
        Ok(self.get(handle)?.fields().to_vec())
    }

    /// One field by declared or wire name
    pub fn field(&self, handle: TypeHandle, name: &str) -> MapperResult<FieldDescriptor> {
        self.get(handle)?.field(name).cloned()
    }

    /// The identifier field of a type
    pub fn id_field(&self, handle: TypeHandle) -> MapperResult<FieldDescriptor> {
        self.get(handle)?.id_field().cloned()
    }

    /// Whether metadata for `handle` is currently cached
    pub fn contains(&self, handle: TypeHandle) -> bool {
        self.entries.lock().contains(&handle.type_id())
    }

    /// Drop cached metadata for one type; it is rebuilt on next access
    pub fn invalidate(&self, handle: TypeHandle) {
        self.entries.lock().pop(&handle.type_id());
    }

    /// Number of cached types
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured capacity, `0` for unbounded
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Activity counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn remember(&self, ty: &EntityType) {
        let handle = ty.handle();
        self.handles.insert(handle.type_id(), handle);
        if let Some(collection) = ty.collection_name() {
            self.by_collection.insert(collection.to_string(), handle);
        }
        for dep in ty.dependencies() {
            self.handles.entry(dep.type_id()).or_insert(dep);
        }
    }
}

impl Default for TypeMetadataCache {
    fn default() -> Self {
        Self::new(0)
    }
}
