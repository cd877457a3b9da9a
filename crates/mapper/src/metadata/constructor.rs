//! Constructor registry
//!
//! Keyed by `TypeId` like the metadata cache, but kept separately: decode
//! needs a fresh instance far more often than it needs a rebuild of the
//! field table, and constructors are never evicted.

use std::any::TypeId;

use dashmap::DashMap;

use crate::entity::{Constructor, Entity, TypeHandle};
use crate::error::{MapperError, MapperResult};

/// Cache of no-argument constructors
#[derive(Default)]
pub struct ConstructorRegistry {
    ctors: DashMap<TypeId, Constructor>,
}

impl ConstructorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the constructor of `handle`
    pub fn register(&self, handle: TypeHandle) {
        self.ctors.insert(handle.type_id(), handle.constructor());
    }

    /// Fresh instance of the type
    ///
    /// # Errors
    ///
    /// `ConstructionError` if the type has no constructor.
    pub fn new_instance(&self, handle: TypeHandle) -> MapperResult<Box<dyn Entity>> {
        let ctor = match self.ctors.get(&handle.type_id()).map(|c| *c) {
            Some(ctor) => ctor,
            None => {
                let ctor = handle.constructor();
                self.ctors.insert(handle.type_id(), ctor);
                ctor
            }
        };
        ctor().ok_or_else(|| MapperError::ConstructionError {
            type_name: handle.simple_name().to_string(),
        })
    }

    /// Whether a constructor is cached for `handle`
    pub fn contains(&self, handle: TypeHandle) -> bool {
        self.ctors.contains_key(&handle.type_id())
    }

    /// Number of cached constructors
    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}
