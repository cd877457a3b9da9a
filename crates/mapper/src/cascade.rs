//! Cascading reference resolution
//!
//! Three operations walk reference fields:
//!
//! - `resolve_reads` replaces the stubs of every `READ` reference of a set
//!   of freshly decoded owners, level by level up to `max_cascade_depth`.
//!   References inside embedded objects are resolved along with their
//!   owner's level.
//! - `fetch` follows a dotted path such as `"author.publisher"` from a set
//!   of owners, replacing stub references with stored entities. Every level
//!   of the path costs one store call per target collection, however many
//!   owners and elements are involved. Ids that no longer resolve drop out
//!   of their container.
//! - `delete_dependents` removes the entities referenced through fields
//!   flagged `DELETE`, one bulk delete per target collection. It does not
//!   check whether anything else still references them.
//!
//! Reads share one rule: each level costs one store call per target
//! collection, however many owners are involved.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use docmap_core::{NativeId, SortSpec};
use tracing::debug;

use crate::codec::shape::{collect_entities_mut, rebuild, sort_entities, visit_entities};
use crate::codec::{DecodeContext, Site};
use crate::entity::Entity;
use crate::error::{MapperError, MapperResult};
use crate::field_value::FieldValue;
use crate::mapper::EntityMapper;
use crate::metadata::{CascadeSpec, EntityType, FieldDescriptor, FieldRole, ReferenceSpec};

struct BatchGroup {
    ty: Arc<EntityType>,
    ids: Vec<NativeId>,
    seen: HashSet<NativeId>,
}

/// Ids to look up, grouped by target collection
#[derive(Default)]
pub(crate) struct BatchRequest {
    groups: BTreeMap<String, BatchGroup>,
}

impl BatchRequest {
    /// Queue `id` of type `ty`; duplicates are ignored
    pub fn add(&mut self, ty: &Arc<EntityType>, id: NativeId) -> MapperResult<()> {
        let collection = ty.collection()?;
        let group = self
            .groups
            .entry(collection.to_string())
            .or_insert_with(|| BatchGroup {
                ty: Arc::clone(ty),
                ids: Vec::new(),
                seen: HashSet::new(),
            });
        if group.seen.insert(id.clone()) {
            group.ids.push(id);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct ids queued
    pub fn len(&self) -> usize {
        self.groups.values().map(|g| g.ids.len()).sum()
    }
}

/// Decoded entities of one batch, with their position in the store's reply
#[derive(Default)]
pub(crate) struct Batch {
    entities: HashMap<(String, NativeId), (usize, Box<dyn Entity>)>,
}

impl Batch {
    /// Copy of the entity loaded for `id`
    pub fn get(&self, collection: &str, id: &NativeId) -> Option<Box<dyn Entity>> {
        self.entities
            .get(&(collection.to_string(), id.clone()))
            .map(|(_, entity)| entity.clone())
    }

    /// Position of `entity` in the store's reply; unknown entities sort last
    pub fn position_of(&self, mapper: &EntityMapper, entity: &dyn Entity) -> usize {
        let key = mapper.type_of(entity).ok().and_then(|ty| {
            let collection = ty.collection_name()?.to_string();
            let id = mapper.native_id_of(&ty, entity).ok()??;
            Some((collection, id))
        });
        key.and_then(|key| self.entities.get(&key))
            .map(|(position, _)| *position)
            .unwrap_or(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// Resolve every queued id with one store call per collection
///
/// `single` permits a plain id lookup when a collection has exactly one
/// queued id. Loaded documents decode with stub references.
pub(crate) fn load_batch(
    mapper: &EntityMapper,
    request: &BatchRequest,
    sort: Option<&SortSpec>,
    single: bool,
    depth: usize,
) -> MapperResult<Batch> {
    let mut cx = DecodeContext::new(mapper);
    let mut batch = Batch::default();
    for (collection, group) in &request.groups {
        let docs = match (single, group.ids.as_slice()) {
            (true, [id]) => mapper.store().find_by_id(collection, id)?.into_iter().collect(),
            _ => mapper.store().find_by_ids(collection, &group.ids, sort)?,
        };
        debug!(
            target: "docmap::cascade",
            collection = collection.as_str(),
            requested = group.ids.len(),
            found = docs.len(),
            depth,
            "Resolved reference batch"
        );
        for (position, doc) in docs.iter().enumerate() {
            let Some(id) = doc.id().and_then(NativeId::from_value) else {
                continue;
            };
            let entity = mapper.decode_entity(&mut cx, group.ty.handle(), doc)?;
            batch
                .entities
                .insert((collection.clone(), id), (position, entity));
        }
    }
    Ok(batch)
}

/// Queue the ids of every stored entity inside `value`
fn queue_entities(
    mapper: &EntityMapper,
    request: &mut BatchRequest,
    value: &FieldValue,
) -> MapperResult<()> {
    visit_entities(value, &mut |entity: &dyn Entity| {
        let target = mapper.type_of(entity)?;
        if let Some(id) = mapper.native_id_of(&target, entity)? {
            request.add(&target, id)?;
        }
        Ok(())
    })
}

/// Walks reference fields for fetch and delete cascades
pub struct CascadeOrchestrator<'m> {
    mapper: &'m EntityMapper,
}

impl<'m> CascadeOrchestrator<'m> {
    /// Orchestrator over `mapper`'s store and metadata
    pub fn new(mapper: &'m EntityMapper) -> Self {
        CascadeOrchestrator { mapper }
    }

    /// Resolve every `READ` reference of `owners`, starting at `depth`
    ///
    /// Owners must all be of type `ty`. References beyond
    /// `max_cascade_depth` stay stubs.
    pub fn resolve_reads(
        &self,
        ty: &EntityType,
        owners: &mut [&mut dyn Entity],
        depth: usize,
    ) -> MapperResult<()> {
        self.resolve_reads_at(ty, owners, depth).map(|_| ())
    }

    /// Returns whether any owner field was replaced
    fn resolve_reads_at(
        &self,
        ty: &EntityType,
        owners: &mut [&mut dyn Entity],
        depth: usize,
    ) -> MapperResult<bool> {
        if owners.is_empty() {
            return Ok(false);
        }
        let can_read = depth < self.mapper.config().max_cascade_depth;
        let mut replaced = false;
        for field in ty.fields() {
            match (field.role(), field.reference_spec()) {
                (FieldRole::EmbeddedObject | FieldRole::EmbeddedCollection, _) => {
                    let mut values = self.read_level(ty, field, owners);
                    let mut changed = false;
                    self.for_each_type(&mut values, &mut |target, members| {
                        changed |= self.resolve_reads_at(target, members, depth)?;
                        Ok(())
                    })?;
                    // Untouched embedded values are not written back
                    if changed {
                        self.store_level(ty, field, owners, values);
                        replaced = true;
                    }
                }
                (_, Some(spec)) if can_read && spec.cascade.contains(CascadeSpec::READ) => {
                    let mut values = self.load_level(ty, field, spec, owners, depth)?;
                    self.for_each_type(&mut values, &mut |target, members| {
                        self.resolve_reads_at(target, members, depth + 1).map(|_| ())
                    })?;
                    self.store_level(ty, field, owners, values);
                    replaced = true;
                }
                _ => {}
            }
        }
        Ok(replaced)
    }

    /// Resolve the references along `path` for every owner
    ///
    /// Owners must all be of type `ty`.
    ///
    /// # Errors
    ///
    /// `FieldNotFound` for an unknown segment, `CascadePath` for a segment
    /// that is not a reference field, `DepthExceeded` for a path longer
    /// than the configured depth.
    pub fn fetch(
        &self,
        ty: &EntityType,
        owners: &mut [&mut dyn Entity],
        path: &str,
    ) -> MapperResult<()> {
        self.fetch_at(ty, owners, path, path, 0)
    }

    fn fetch_at(
        &self,
        ty: &EntityType,
        owners: &mut [&mut dyn Entity],
        full_path: &str,
        path: &str,
        depth: usize,
    ) -> MapperResult<()> {
        let limit = self.mapper.config().max_cascade_depth;
        if depth >= limit {
            return Err(MapperError::DepthExceeded {
                type_name: ty.type_name().to_string(),
                limit,
            });
        }

        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let field = ty.field(head)?;
        let spec = field
            .reference_spec()
            .ok_or_else(|| MapperError::CascadePath {
                type_name: ty.type_name().to_string(),
                path: full_path.to_string(),
                reason: format!("`{}` is a {} field", head, field.role().name()),
            })?;

        let mut values = self.load_level(ty, field, spec, owners, depth)?;
        if let Some(rest) = rest {
            self.for_each_type(&mut values, &mut |target, members| {
                self.fetch_at(target, members, full_path, rest, depth + 1)
            })?;
        }
        self.store_level(ty, field, owners, values);
        Ok(())
    }

    /// Current value of `field` on every owner; unreadable ones are skipped
    fn read_level(
        &self,
        ty: &EntityType,
        field: &FieldDescriptor,
        owners: &[&mut dyn Entity],
    ) -> Vec<Option<FieldValue>> {
        let site = Site::new(ty, field);
        owners
            .iter()
            .map(|owner| match owner.get_field(field.name()) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.mapper.skip_field(site, &site.access(e));
                    None
                }
            })
            .collect()
    }

    /// Values of `field` with every stored reference replaced by its entity
    ///
    /// One store call per target collection covers all owners. Ids that no
    /// longer resolve drop out.
    fn load_level(
        &self,
        ty: &EntityType,
        field: &FieldDescriptor,
        spec: &ReferenceSpec,
        owners: &[&mut dyn Entity],
        depth: usize,
    ) -> MapperResult<Vec<Option<FieldValue>>> {
        let mapper = self.mapper;
        let values = self.read_level(ty, field, owners);

        let mut request = BatchRequest::default();
        for value in values.iter().flatten() {
            queue_entities(mapper, &mut request, value)?;
        }
        let batch = if request.is_empty() {
            Batch::default()
        } else {
            let single = owners.len() == 1 && matches!(field.role(), FieldRole::Reference(_));
            load_batch(mapper, &request, spec.sort.as_ref(), single, depth + 1)?
        };
        debug!(
            target: "docmap::cascade",
            type_name = ty.type_name(),
            field = field.name(),
            owners = owners.len(),
            requested = request.len(),
            resolved = batch.len(),
            depth,
            "Resolved cascade level"
        );

        let mut rebuilt = Vec::with_capacity(values.len());
        for value in values {
            let Some(value) = value else {
                rebuilt.push(None);
                continue;
            };
            let mut value = rebuild(value, &mut |entity: Box<dyn Entity>| {
                let target = mapper.type_of(&*entity)?;
                let id = mapper.native_id_of(&target, &*entity)?;
                match (target.collection_name(), id) {
                    (Some(collection), Some(id)) => {
                        Ok(batch.get(collection, &id).map(FieldValue::Entity))
                    }
                    // Never stored, keep as is
                    _ => Ok(Some(FieldValue::Entity(entity))),
                }
            })?
            .unwrap_or(FieldValue::Null);
            if spec.sort.is_some() {
                sort_entities(&mut value, &|e| batch.position_of(mapper, e));
            }
            rebuilt.push(Some(value));
        }
        Ok(rebuilt)
    }

    /// Call `f` once per entity type found inside `values`
    fn for_each_type(
        &self,
        values: &mut [Option<FieldValue>],
        f: &mut dyn FnMut(&EntityType, &mut [&mut dyn Entity]) -> MapperResult<()>,
    ) -> MapperResult<()> {
        let mut entities = Vec::new();
        for value in values.iter_mut().flatten() {
            collect_entities_mut(value, &mut entities);
        }
        let mut groups: Vec<(TypeId, &'static str, Vec<&mut dyn Entity>)> = Vec::new();
        for entity in entities {
            let type_id = entity.entity_type_id();
            match groups.iter_mut().find(|(id, _, _)| *id == type_id) {
                Some((_, _, members)) => members.push(entity),
                None => groups.push((type_id, entity.entity_type_name(), vec![entity])),
            }
        }
        for (type_id, type_name, mut members) in groups {
            let target = self.mapper.metadata().get_by_type_id(type_id, type_name)?;
            f(&target, &mut members)?;
        }
        Ok(())
    }

    /// Write `values` back to their owners
    fn store_level(
        &self,
        ty: &EntityType,
        field: &FieldDescriptor,
        owners: &mut [&mut dyn Entity],
        values: Vec<Option<FieldValue>>,
    ) {
        let site = Site::new(ty, field);
        for (owner, value) in owners.iter_mut().zip(values) {
            if let Some(value) = value {
                if let Err(e) = owner.set_field(field.name(), value) {
                    self.mapper.skip_field(site, &site.access(e));
                }
            }
        }
    }

    /// Delete every entity referenced through a `DELETE` field of `entity`
    ///
    /// Returns the number of documents removed.
    pub fn delete_dependents(&self, ty: &EntityType, entity: &dyn Entity) -> MapperResult<usize> {
        let mapper = self.mapper;
        let mut request = BatchRequest::default();
        for field in ty.reference_fields() {
            if !field.cascade().contains(CascadeSpec::DELETE) {
                continue;
            }
            let site = Site::new(ty, field);
            match entity.get_field(field.name()) {
                Ok(value) => queue_entities(mapper, &mut request, &value)?,
                Err(e) => mapper.skip_field(site, &site.access(e)),
            }
        }

        let mut removed = 0;
        for (collection, group) in &request.groups {
            let count = mapper.store().delete_by_ids(collection, &group.ids)?;
            debug!(
                target: "docmap::cascade",
                type_name = ty.type_name(),
                collection = collection.as_str(),
                requested = group.ids.len(),
                removed = count,
                "Deleted dependents"
            );
            removed += count;
        }
        Ok(removed)
    }
}
