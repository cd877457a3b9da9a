//! Identifier codec
//!
//! Always emitted. An empty identifier is filled by the field's strategy
//! and written back to the entity, so encoding the same entity twice
//! yields the same id.

use docmap_core::{Document, NativeId, Value};
use tracing::debug;

use super::{DecodeContext, EncodeContext, FieldCodec, Site};
use crate::entity::Entity;
use crate::error::{MapperError, MapperResult};
use crate::field_value::FieldValue;
use crate::id_strategy::IdContext;
use crate::metadata::{EntityType, FieldDescriptor, FieldRole};

/// Codec for the `_id` field
#[derive(Debug, Default)]
pub struct IdentifierCodec;

impl FieldCodec for IdentifierCodec {
    fn kind(&self) -> &'static str {
        "identifier"
    }

    fn is_emittable(&self, _value: &FieldValue) -> bool {
        true
    }

    fn encode(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>> {
        let site = Site::new(ty, field);
        let spec = match field.role() {
            FieldRole::Identifier(spec) => *spec,
            other => {
                return Err(MapperError::InvalidFieldType {
                    type_name: ty.type_name().to_string(),
                    field: field.name().to_string(),
                    reason: format!("{} field given to the identifier codec", other.name()),
                })
            }
        };
        let current = match owner.get_field(field.name()).map_err(|e| site.access(e))? {
            FieldValue::Null => None,
            FieldValue::String(s) if s.is_empty() => None,
            FieldValue::String(s) => Some(s),
            other => {
                return Err(site.mismatch(format!(
                    "identifier must be a string, found {}",
                    other.kind_name()
                )))
            }
        };

        let mapper = cx.mapper();
        let ctx = IdContext {
            type_name: ty.type_name(),
            collection: ty.collection_name(),
            spec: &spec,
            default_start: mapper.config().default_auto_increment_start,
            store: mapper.store(),
        };
        let native = mapper
            .strategies()
            .get(spec.kind)
            .resolve(&ctx, current.as_deref())?;

        if current.is_none() {
            owner
                .set_field(field.name(), FieldValue::String(native.to_string()))
                .map_err(|e| site.access(e))?;
            cx.note_assigned();
            debug!(
                target: "docmap::id",
                type_name = ty.type_name(),
                strategy = spec.kind.name(),
                id = %native,
                "Assigned id"
            );
        }
        Ok(Some(native.to_value()))
    }

    fn decode(
        &self,
        _cx: &mut DecodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        doc: &Document,
        target: &mut dyn Entity,
    ) -> MapperResult<()> {
        let site = Site::new(ty, field);
        let Some(raw) = doc.get(self.wire_name(field)) else {
            return Ok(());
        };
        let value = match raw {
            Value::Null => FieldValue::Null,
            raw => {
                let id = NativeId::from_value(raw).ok_or_else(|| {
                    site.mismatch(format!("{} cannot be an identifier", raw.type_name()))
                })?;
                FieldValue::String(id.to_string())
            }
        };
        target
            .set_field(field.name(), value)
            .map_err(|e| site.access(e))
    }
}
