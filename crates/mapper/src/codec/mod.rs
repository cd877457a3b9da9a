//! Field codecs
//!
//! One codec per role, chosen when the field's descriptor is built:
//!
//! | role                              | codec              |
//! |-----------------------------------|--------------------|
//! | Identifier                        | `IdentifierCodec`  |
//! | Scalar                            | `ScalarFieldCodec` |
//! | EmbeddedObject / Collection       | `EmbeddedCodec`    |
//! | Reference / ReferenceCollection   | `ReferenceCodec`   |
//! | Ignored                           | `IgnoredCodec`     |
//!
//! Scalar fields additionally carry a [`ScalarCodec`] chosen per declared
//! scalar kind and container flavor.

mod embedded;
mod identifier;
mod reference;
mod scalar;
pub(crate) mod shape;

use std::collections::HashSet;
use std::sync::Arc;

use docmap_core::{Document, NativeId, Value};

use crate::entity::{Entity, FieldAccessError};
use crate::error::{MapperError, MapperResult};
use crate::field_value::FieldValue;
use crate::mapper::EntityMapper;
use crate::metadata::{EntityType, FieldDescriptor, FieldRole, FieldType};

pub use embedded::EmbeddedCodec;
pub use identifier::IdentifierCodec;
pub use reference::ReferenceCodec;
pub use scalar::{scalar_codec_for, ScalarCodec, ScalarFieldCodec};

/// Converts one field between entity and document
pub trait FieldCodec: Send + Sync {
    /// Short name for logs and `Debug`
    fn kind(&self) -> &'static str;

    /// Key written to the document
    fn wire_name<'a>(&self, field: &'a FieldDescriptor) -> &'a str {
        field.wire_name()
    }

    /// Whether a value is written at all; null values are left out
    fn is_emittable(&self, value: &FieldValue) -> bool {
        !value.is_null()
    }

    /// Read the field from `owner` and produce its wire value
    ///
    /// `Ok(None)` leaves the field out of the document.
    fn encode(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>>;

    /// Read the field's wire value from `doc` and set it on `target`
    ///
    /// A key missing from the document leaves the field untouched.
    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        doc: &Document,
        target: &mut dyn Entity,
    ) -> MapperResult<()>;
}

/// State carried through one `to_document` call
pub struct EncodeContext<'m> {
    mapper: &'m EntityMapper,
    skip_cascade_persist: bool,
    depth: usize,
    embedded: usize,
    assigned: usize,
    visited: HashSet<(String, NativeId)>,
}

impl<'m> EncodeContext<'m> {
    pub(crate) fn new(mapper: &'m EntityMapper, skip_cascade_persist: bool) -> Self {
        EncodeContext {
            mapper,
            skip_cascade_persist,
            depth: 0,
            embedded: 0,
            assigned: 0,
            visited: HashSet::new(),
        }
    }

    /// Mapper driving this call
    pub fn mapper(&self) -> &'m EntityMapper {
        self.mapper
    }

    /// Whether referenced entities are written along with the owner
    pub fn skip_cascade_persist(&self) -> bool {
        self.skip_cascade_persist
    }

    /// Cascade depth of the entity being encoded
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of ids filled in so far, at any nesting level
    pub fn assigned_ids(&self) -> usize {
        self.assigned
    }

    pub(crate) fn note_assigned(&mut self) {
        self.assigned += 1;
    }

    /// Record an entity as written; false if it already was
    pub(crate) fn mark_visited(&mut self, collection: &str, id: &NativeId) -> bool {
        self.visited.insert((collection.to_string(), id.clone()))
    }

    /// Run `f` one cascade level deeper
    pub(crate) fn descend<R>(
        &mut self,
        type_name: &str,
        f: impl FnOnce(&mut Self) -> MapperResult<R>,
    ) -> MapperResult<R> {
        let limit = self.mapper.config().max_cascade_depth;
        if self.depth >= limit {
            return Err(MapperError::DepthExceeded {
                type_name: type_name.to_string(),
                limit,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` one embedded level deeper
    pub(crate) fn embed<R>(
        &mut self,
        type_name: &str,
        f: impl FnOnce(&mut Self) -> MapperResult<R>,
    ) -> MapperResult<R> {
        let limit = self.mapper.config().max_embedded_depth;
        if self.embedded >= limit {
            return Err(MapperError::DepthExceeded {
                type_name: type_name.to_string(),
                limit,
            });
        }
        self.embedded += 1;
        let result = f(self);
        self.embedded -= 1;
        result
    }
}

/// State carried through one document decode
///
/// Decoding never touches the store: references come out as stubs and
/// `READ` cascades are resolved afterwards, one batch per level.
pub struct DecodeContext<'m> {
    mapper: &'m EntityMapper,
    embedded: usize,
}

impl<'m> DecodeContext<'m> {
    pub(crate) fn new(mapper: &'m EntityMapper) -> Self {
        DecodeContext { mapper, embedded: 0 }
    }

    /// Mapper driving this call
    pub fn mapper(&self) -> &'m EntityMapper {
        self.mapper
    }

    /// Embedded nesting of the document being decoded
    pub fn embedded_depth(&self) -> usize {
        self.embedded
    }

    /// Run `f` one embedded level deeper
    pub(crate) fn embed<R>(
        &mut self,
        type_name: &str,
        f: impl FnOnce(&mut Self) -> MapperResult<R>,
    ) -> MapperResult<R> {
        let limit = self.mapper.config().max_embedded_depth;
        if self.embedded >= limit {
            return Err(MapperError::DepthExceeded {
                type_name: type_name.to_string(),
                limit,
            });
        }
        self.embedded += 1;
        let result = f(self);
        self.embedded -= 1;
        result
    }
}

/// Owner type and field, for error messages
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site<'a> {
    pub owner: &'a str,
    pub field: &'a str,
}

impl<'a> Site<'a> {
    pub fn new(ty: &'a EntityType, field: &'a FieldDescriptor) -> Self {
        Site {
            owner: ty.type_name(),
            field: field.name(),
        }
    }

    pub fn mismatch(&self, detail: impl Into<String>) -> MapperError {
        MapperError::mismatch(self.owner, self.field, detail)
    }

    pub fn access(&self, source: FieldAccessError) -> MapperError {
        MapperError::access(self.owner, self.field, source)
    }
}

/// Codec for fields the mapper never touches
#[derive(Debug, Default)]
pub struct IgnoredCodec;

impl FieldCodec for IgnoredCodec {
    fn kind(&self) -> &'static str {
        "ignored"
    }

    fn is_emittable(&self, _value: &FieldValue) -> bool {
        false
    }

    fn encode(
        &self,
        _cx: &mut EncodeContext<'_>,
        _ty: &EntityType,
        _field: &FieldDescriptor,
        _owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>> {
        Ok(None)
    }

    fn decode(
        &self,
        _cx: &mut DecodeContext<'_>,
        _ty: &EntityType,
        _field: &FieldDescriptor,
        _doc: &Document,
        _target: &mut dyn Entity,
    ) -> MapperResult<()> {
        Ok(())
    }
}

/// Pick the codec for a field
pub(crate) fn select(
    owner: &str,
    field: &str,
    role: &FieldRole,
    field_type: &FieldType,
) -> MapperResult<Arc<dyn FieldCodec>> {
    let codec: Arc<dyn FieldCodec> = match role {
        FieldRole::Identifier(_) => Arc::new(IdentifierCodec),
        FieldRole::Scalar { .. } => {
            let inner = scalar_codec_for(field_type).ok_or_else(|| {
                MapperError::InvalidFieldType {
                    type_name: owner.to_string(),
                    field: field.to_string(),
                    reason: format!("no scalar codec for {}", field_type),
                }
            })?;
            Arc::new(ScalarFieldCodec::new(inner))
        }
        FieldRole::EmbeddedObject | FieldRole::EmbeddedCollection => Arc::new(EmbeddedCodec),
        FieldRole::Reference(_) | FieldRole::ReferenceCollection(_) => Arc::new(ReferenceCodec),
        FieldRole::Ignored => Arc::new(IgnoredCodec),
    };
    Ok(codec)
}
