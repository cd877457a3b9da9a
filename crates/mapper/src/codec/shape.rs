//! Container walkers for entity-valued fields
//!
//! Embedded and reference fields share the container rules of scalar
//! fields (arrays, collections and maps, nested to any depth) but apply a
//! per-entity step at the leaves. These walkers own the container part.
//!
//! Decode leaves may return `None`, which drops that element: a reference
//! that no longer resolves shrinks its container instead of leaving a hole.

use std::collections::BTreeMap;

use docmap_core::{Document, Value};

use super::Site;
use crate::entity::{Entity, TypeHandle};
use crate::error::MapperResult;
use crate::field_value::FieldValue;
use crate::metadata::FieldType;

/// Encode a field value of the declared shape, calling `leaf` per entity
///
/// The value is walked mutably so leaves can write ids back.
pub(crate) fn encode_shape(
    site: Site<'_>,
    field_type: &FieldType,
    value: &mut FieldValue,
    leaf: &mut dyn FnMut(&mut dyn Entity) -> MapperResult<Value>,
) -> MapperResult<Value> {
    match (field_type, value) {
        (_, FieldValue::Null) => Ok(Value::Null),
        (FieldType::Entity(_), FieldValue::Entity(entity)) => leaf(&mut **entity),
        (FieldType::Array(inner) | FieldType::Collection(_, inner), FieldValue::Seq(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter_mut() {
                out.push(encode_shape(site, inner, item, leaf)?);
            }
            Ok(Value::Array(out))
        }
        (FieldType::Map(inner), FieldValue::Map(entries)) => {
            let mut doc = Document::new();
            for (key, item) in entries.iter_mut() {
                let wire = encode_shape(site, inner, item, leaf)?;
                doc.insert(key.clone(), wire);
            }
            Ok(Value::Document(doc))
        }
        (field_type, other) => Err(site.mismatch(format!(
            "expected {}, found {}",
            field_type,
            other.kind_name()
        ))),
    }
}

/// Decode a wire value of the declared shape, calling `leaf` per entity
///
/// Returns `None` only when a top-level leaf was dropped.
pub(crate) fn decode_shape(
    site: Site<'_>,
    field_type: &FieldType,
    value: &Value,
    leaf: &mut dyn FnMut(&Value, TypeHandle) -> MapperResult<Option<FieldValue>>,
) -> MapperResult<Option<FieldValue>> {
    match (field_type, value) {
        (_, Value::Null) => Ok(Some(FieldValue::Null)),
        (FieldType::Entity(handle), value) => leaf(value, *handle),
        (FieldType::Array(inner) | FieldType::Collection(_, inner), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(decoded) = decode_shape(site, inner, item, leaf)? {
                    out.push(decoded);
                }
            }
            Ok(Some(FieldValue::Seq(out)))
        }
        (FieldType::Map(inner), Value::Document(doc)) => {
            let mut out = BTreeMap::new();
            for (key, item) in doc {
                if let Some(decoded) = decode_shape(site, inner, item, leaf)? {
                    out.insert(key.clone(), decoded);
                }
            }
            Ok(Some(FieldValue::Map(out)))
        }
        (field_type, other) => Err(site.mismatch(format!(
            "expected {}, found {}",
            field_type,
            other.type_name()
        ))),
    }
}

/// Visit every entity inside an in-memory value
pub(crate) fn visit_entities(
    value: &FieldValue,
    visit: &mut dyn FnMut(&dyn Entity) -> MapperResult<()>,
) -> MapperResult<()> {
    match value {
        FieldValue::Entity(entity) => visit(&**entity),
        FieldValue::Seq(items) => items.iter().try_for_each(|item| visit_entities(item, visit)),
        FieldValue::Map(entries) => entries
            .values()
            .try_for_each(|item| visit_entities(item, visit)),
        _ => Ok(()),
    }
}

/// Replace every entity inside an in-memory value
///
/// `leaf` returning `None` drops the element. Returns `None` when the
/// value itself was a dropped entity.
pub(crate) fn rebuild(
    value: FieldValue,
    leaf: &mut dyn FnMut(Box<dyn Entity>) -> MapperResult<Option<FieldValue>>,
) -> MapperResult<Option<FieldValue>> {
    match value {
        FieldValue::Entity(entity) => leaf(entity),
        FieldValue::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(rebuilt) = rebuild(item, leaf)? {
                    out.push(rebuilt);
                }
            }
            Ok(Some(FieldValue::Seq(out)))
        }
        FieldValue::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                if let Some(rebuilt) = rebuild(item, leaf)? {
                    out.insert(key, rebuilt);
                }
            }
            Ok(Some(FieldValue::Map(out)))
        }
        other => Ok(Some(other)),
    }
}

/// Collect mutable references to every entity inside a value
pub(crate) fn collect_entities_mut<'a>(
    value: &'a mut FieldValue,
    out: &mut Vec<&'a mut dyn Entity>,
) {
    match value {
        FieldValue::Entity(entity) => out.push(&mut **entity),
        FieldValue::Seq(items) => {
            for item in items.iter_mut() {
                collect_entities_mut(item, out);
            }
        }
        FieldValue::Map(entries) => {
            for item in entries.values_mut() {
                collect_entities_mut(item, out);
            }
        }
        _ => {}
    }
}

/// Order entity sequences by `key`, at every nesting level
///
/// Non-entity elements sort last. Maps keep their key order.
pub(crate) fn sort_entities(value: &mut FieldValue, key: &dyn Fn(&dyn Entity) -> usize) {
    match value {
        FieldValue::Seq(items) => {
            for item in items.iter_mut() {
                sort_entities(item, key);
            }
            items.sort_by_cached_key(|item| match item {
                FieldValue::Entity(entity) => key(&**entity),
                _ => usize::MAX,
            });
        }
        FieldValue::Map(entries) => {
            for item in entries.values_mut() {
                sort_entities(item, key);
            }
        }
        _ => {}
    }
}
