//! Post-commit hooks
//!
//! Listeners run synchronously, in registration order, after the store
//! call they observe has returned successfully. A failing listener is
//! logged and skipped; the write it observed stays committed.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::entity::Entity;
use crate::error::MapperResult;
use crate::metadata::EntityType;

/// Write operation a hook observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// Document inserted
    Insert,
    /// Document replaced
    Update,
    /// Document deleted
    Remove,
}

impl HookEvent {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::Insert => "insert",
            HookEvent::Update => "update",
            HookEvent::Remove => "remove",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer of committed writes
pub trait EntityListener: Send + Sync {
    /// After an insert
    fn on_insert(&self, _ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        Ok(())
    }

    /// After a replace
    fn on_update(&self, _ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        Ok(())
    }

    /// After a delete
    fn on_remove(&self, _ty: &EntityType, _entity: &dyn Entity) -> MapperResult<()> {
        Ok(())
    }
}

/// Ordered list of listeners
#[derive(Default)]
pub struct HookList {
    listeners: RwLock<Vec<Arc<dyn EntityListener>>>,
}

impl HookList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener
    pub fn register(&self, listener: Arc<dyn EntityListener>) {
        self.listeners.write().push(listener);
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Run every listener for `event`
    ///
    /// Returns the number of listeners that failed.
    pub fn fire(&self, event: HookEvent, ty: &EntityType, entity: &dyn Entity) -> usize {
        // Snapshot so listeners may register others without deadlocking
        let listeners: Vec<Arc<dyn EntityListener>> = self.listeners.read().clone();
        let mut failed = 0;
        for listener in listeners {
            let result = match event {
                HookEvent::Insert => listener.on_insert(ty, entity),
                HookEvent::Update => listener.on_update(ty, entity),
                HookEvent::Remove => listener.on_remove(ty, entity),
            };
            if let Err(e) = result {
                failed += 1;
                warn!(
                    target: "docmap::hooks",
                    event = %event,
                    type_name = ty.type_name(),
                    error = %e,
                    "Listener failed"
                );
            }
        }
        failed
    }
}

impl fmt::Debug for HookList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("listeners", &self.len())
            .finish()
    }
}
