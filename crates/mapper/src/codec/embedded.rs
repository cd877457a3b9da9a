//! Embedded object and embedded collection codec
//!
//! Nested entities are written as sub-documents through the mapper, with
//! the same container rules as scalar fields. Decoding builds the declared
//! element type, so embedded values are not polymorphic.
//!
//! Embedded levels are bounded by `max_embedded_depth`, separately from
//! reference cascades.

use docmap_core::{Document, Value};

use super::shape::{decode_shape, encode_shape};
use super::{DecodeContext, EncodeContext, FieldCodec, Site};
use crate::entity::{Entity, TypeHandle};
use crate::error::MapperResult;
use crate::field_value::FieldValue;
use crate::metadata::{EntityType, FieldDescriptor};

/// Codec for sub-document fields
#[derive(Debug, Default)]
pub struct EmbeddedCodec;

impl FieldCodec for EmbeddedCodec {
    fn kind(&self) -> &'static str {
        "embedded"
    }

    fn encode(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>> {
        let site = Site::new(ty, field);
        let mut value = owner.get_field(field.name()).map_err(|e| site.access(e))?;
        if !self.is_emittable(&value) {
            return Ok(None);
        }

        let mapper = cx.mapper();
        let assigned_before = cx.assigned_ids();
        let wire = encode_shape(site, field.field_type(), &mut value, &mut |entity: &mut dyn Entity| {
            let nested = mapper.type_of(&*entity)?;
            let doc = cx.embed(nested.type_name(), |cx| {
                mapper.encode_entity(cx, &nested, entity)
            })?;
            Ok(Value::Document(doc))
        })?;

        // Ids filled in anywhere below, including through references
        if cx.assigned_ids() > assigned_before {
            owner
                .set_field(field.name(), value)
                .map_err(|e| site.access(e))?;
        }
        Ok(Some(wire))
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        doc: &Document,
        target: &mut dyn Entity,
    ) -> MapperResult<()> {
        let site = Site::new(ty, field);
        let Some(raw) = doc.get(self.wire_name(field)) else {
            return Ok(());
        };

        let mapper = cx.mapper();
        let value = decode_shape(site, field.field_type(), raw, &mut |wire: &Value, handle: TypeHandle| {
            match wire {
                Value::Document(nested) => {
                    let entity = cx.embed(handle.simple_name(), |cx| {
                        mapper.decode_entity(cx, handle, nested)
                    })?;
                    Ok(Some(FieldValue::Entity(entity)))
                }
                other => Err(site.mismatch(format!(
                    "expected document, found {}",
                    other.type_name()
                ))),
            }
        })?
        .unwrap_or(FieldValue::Null);

        target
            .set_field(field.name(), value)
            .map_err(|e| site.access(e))
    }
}
