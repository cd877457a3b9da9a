//! Reference encodings
//!
//! A reference to a stored entity is written in one of two forms:
//!
//! - reduced: the native id alone; the target type comes from the
//!   referencing field's declared type, so reduced references cannot be
//!   polymorphic
//! - full: a `DbRef` carrying the target collection and the native id
//!
//! Decoding checks the form. A reduced reader meeting a `DbRef`, or a full
//! reader meeting a bare id, fails with `ReferenceMismatch` instead of
//! guessing.

use std::sync::Arc;

use docmap_core::{DbRef, NativeId, Value};

use crate::codec::Site;
use crate::entity::TypeHandle;
use crate::error::{MapperError, MapperResult};
use crate::id_strategy::IdStrategies;
use crate::metadata::{EntityType, TypeMetadataCache};

/// Wire value of the wrong reference form
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingMismatch {
    /// Form the reader expected
    pub expected: &'static str,
    /// Wire type that was found
    pub found: String,
}

impl EncodingMismatch {
    /// Attach the owning type and field
    pub fn at(self, type_name: &str, field: &str) -> MapperError {
        MapperError::ReferenceMismatch {
            type_name: type_name.to_string(),
            field: field.to_string(),
            expected: self.expected,
            found: self.found,
        }
    }
}

fn form(reduced: bool) -> &'static str {
    if reduced {
        "reduced reference"
    } else {
        "full reference"
    }
}

/// Converts between string ids and reference wire values
pub struct ReferenceResolver {
    strategies: Arc<IdStrategies>,
}

impl ReferenceResolver {
    /// Resolver parsing ids with `strategies`
    pub fn new(strategies: Arc<IdStrategies>) -> Self {
        ReferenceResolver { strategies }
    }

    /// Wire value referencing `id` of `target`
    ///
    /// # Errors
    ///
    /// `NotACollection` for embeddable targets, `NoIdentifierField` or
    /// `InvalidIdFormat` when the id cannot be parsed for the target.
    pub fn to_reference(&self, target: &EntityType, id: &str, reduced: bool) -> MapperResult<Value> {
        let spec = target.id_spec().ok_or_else(|| MapperError::NoIdentifierField {
            type_name: target.type_name().to_string(),
        })?;
        let native = self.strategies.parse(&spec, target.type_name(), id)?;
        if reduced {
            Ok(native.to_value())
        } else {
            Ok(Value::Ref(DbRef::new(target.collection()?, native)))
        }
    }

    /// Native id and, for full references, collection of a wire value
    pub fn native_from_reference(
        &self,
        value: &Value,
        reduced: bool,
    ) -> Result<(Option<String>, NativeId), EncodingMismatch> {
        let mismatch = || EncodingMismatch {
            expected: form(reduced),
            found: value.type_name().to_string(),
        };
        match (reduced, value) {
            (false, Value::Ref(db_ref)) => {
                Ok((Some(db_ref.collection.clone()), db_ref.id.clone()))
            }
            (true, Value::Ref(_)) | (false, _) => Err(mismatch()),
            (true, value) => NativeId::from_value(value)
                .map(|id| (None, id))
                .ok_or_else(mismatch),
        }
    }

    /// String-form id of a wire value; the inverse of [`to_reference`]
    ///
    /// [`to_reference`]: ReferenceResolver::to_reference
    pub fn from_reference(&self, value: &Value, reduced: bool) -> Result<String, EncodingMismatch> {
        self.native_from_reference(value, reduced)
            .map(|(_, id)| id.to_string())
    }

    /// Target type and native id of a reference read from `site`
    ///
    /// Reduced references take the declared type. A full reference into a
    /// collection other than the declared type's resolves its type through
    /// the metadata registry.
    pub(crate) fn read(
        &self,
        metadata: &TypeMetadataCache,
        site: Site<'_>,
        value: &Value,
        reduced: bool,
        declared: TypeHandle,
    ) -> MapperResult<(Arc<EntityType>, NativeId)> {
        let (collection, id) = self
            .native_from_reference(value, reduced)
            .map_err(|m| m.at(site.owner, site.field))?;
        let declared_ty = metadata.get(declared)?;
        let collection = match collection {
            Some(collection) if declared_ty.collection_name() != Some(collection.as_str()) => {
                collection
            }
            _ => return Ok((declared_ty, id)),
        };
        let handle = metadata
            .by_collection(&collection)?
            .ok_or(MapperError::UnregisteredType {
                type_name: collection,
            })?;
        Ok((metadata.get(handle)?, id))
    }
}
