//! Reference and reference collection codec
//!
//! Encoding writes each referenced entity as a reduced or full reference.
//! Depending on the field's cascade flags the referenced entity is first
//! inserted (`CREATE`, when its id is empty) or saved (`UPDATE`, when it
//! has one), unless the caller asked to skip cascade persistence.
//!
//! Decoding always produces stubs carrying only the id. `READ` cascades are
//! resolved after decoding by the cascade orchestrator, which batches the
//! lookups of every decoded owner.

use docmap_core::{Document, Value};

use super::shape::{decode_shape, encode_shape};
use super::{DecodeContext, EncodeContext, FieldCodec, Site};
use crate::entity::{Entity, TypeHandle};
use crate::error::{MapperError, MapperResult};
use crate::field_value::FieldValue;
use crate::metadata::{CascadeSpec, EntityType, FieldDescriptor, ReferenceSpec};

/// Codec for fields pointing at entities of another collection
#[derive(Debug, Default)]
pub struct ReferenceCodec;

fn reference_spec<'a>(ty: &EntityType, field: &'a FieldDescriptor) -> MapperResult<&'a ReferenceSpec> {
    field
        .reference_spec()
        .ok_or_else(|| MapperError::InvalidFieldType {
            type_name: ty.type_name().to_string(),
            field: field.name().to_string(),
            reason: format!("{} field given to the reference codec", field.role().name()),
        })
}

impl FieldCodec for ReferenceCodec {
    fn kind(&self) -> &'static str {
        "reference"
    }

    fn encode(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>> {
        let spec = reference_spec(ty, field)?;
        let site = Site::new(ty, field);
        let mut value = owner.get_field(field.name()).map_err(|e| site.access(e))?;
        if !self.is_emittable(&value) {
            return Ok(None);
        }

        let mapper = cx.mapper();
        let assigned_before = cx.assigned_ids();
        let wire = encode_shape(site, field.field_type(), &mut value, &mut |entity: &mut dyn Entity| {
            let target = mapper.type_of(&*entity)?;
            let collection = target.collection()?.to_string();
            let mut id = mapper.native_id_of(&target, &*entity)?;
            if !cx.skip_cascade_persist() {
                if id.is_none() && spec.cascade.contains(CascadeSpec::CREATE) {
                    let created = cx.descend(target.type_name(), |cx| {
                        mapper.persist_cascaded(cx, &target, entity, false)
                    })?;
                    id = Some(created);
                } else if let Some(existing) = &id {
                    if spec.cascade.contains(CascadeSpec::UPDATE)
                        && cx.mark_visited(&collection, existing)
                    {
                        cx.descend(target.type_name(), |cx| {
                            mapper.persist_cascaded(cx, &target, entity, true)
                        })?;
                    }
                }
            }
            let id = id.ok_or_else(|| MapperError::UnsavedEntity {
                type_name: target.type_name().to_string(),
            })?;
            mapper
                .resolver()
                .to_reference(&target, &id.to_string(), spec.reduced)
        })?;

        // Ids filled in on the targets or anywhere below them
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
        let spec = reference_spec(ty, field)?;
        let site = Site::new(ty, field);
        let Some(raw) = doc.get(self.wire_name(field)) else {
            return Ok(());
        };
        let mapper = cx.mapper();
        let resolver = mapper.resolver();
        let metadata = mapper.metadata();
        let value = decode_shape(site, field.field_type(), raw, &mut |wire: &Value, declared: TypeHandle| {
            let (ref_ty, id) = resolver.read(metadata, site, wire, spec.reduced, declared)?;
            Ok(Some(FieldValue::Entity(mapper.stub(&ref_ty, &id)?)))
        })?
        .unwrap_or(FieldValue::Null);

        target
            .set_field(field.name(), value)
            .map_err(|e| site.access(e))
    }
}
