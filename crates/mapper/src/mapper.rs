//! EntityMapper facade
//!
//! Composes the metadata cache, constructor registry, field codecs, id
//! strategies, reference resolver, cascade orchestrator and hook list
//! over one `DocumentStore`:
//!
//! - `to_document` / `from_document`: entity and document conversion
//! - `insert` / `save` / `remove` / `find_by_id` / `find_by_ids` / `count`:
//!   store round trips with post-commit hooks
//! - `fetch_cascade` / `fetch_cascade_all`: on-demand reference resolution
//!
//! Metadata, id and construction errors abort the call. A field whose
//! value cannot be read, written or coerced is logged and skipped.

use std::path::Path;
use std::sync::Arc;

use docmap_core::{Document, DocumentStore, NativeId, ID_KEY};
use tracing::{debug, warn};

use crate::cascade::CascadeOrchestrator;
use crate::codec::{DecodeContext, EncodeContext, Site};
use crate::config::MapperConfig;
use crate::entity::{downcast_entity, Entity, TypeHandle};
use crate::error::{MapperError, MapperResult};
use crate::field_value::FieldValue;
use crate::hooks::{EntityListener, HookEvent, HookList};
use crate::id_strategy::IdStrategies;
use crate::metadata::{ConstructorRegistry, EntityType, TypeMetadataCache};
use crate::reference::ReferenceResolver;

// ============================================================================
// EntityMapper
// ============================================================================

/// Maps entities to and from documents of one store
///
/// Owns its registries; nothing is process-global. Safe to share across
/// threads behind an `Arc`.
///
/// # Example
///
/// ```text
/// let store = Arc::new(MemoryStore::new());
/// let mapper = EntityMapper::new(store);
///
/// let mut book = Book::new("Dune");
/// let id = mapper.insert(&mut book)?;
/// let loaded: Option<Book> = mapper.find_by_id(&id.to_string())?;
/// ```
pub struct EntityMapper {
    store: Arc<dyn DocumentStore>,
    config: MapperConfig,
    metadata: TypeMetadataCache,
    constructors: ConstructorRegistry,
    strategies: Arc<IdStrategies>,
    resolver: ReferenceResolver,
    hooks: HookList,
}

impl EntityMapper {
    /// Mapper over `store` with the default configuration
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let config = MapperConfig::default();
        let strategies = Arc::new(IdStrategies::new());
        EntityMapper {
            store,
            metadata: TypeMetadataCache::new(config.metadata_cache_capacity),
            constructors: ConstructorRegistry::new(),
            resolver: ReferenceResolver::new(Arc::clone(&strategies)),
            strategies,
            hooks: HookList::new(),
            config,
        }
    }

    /// Mapper over `store` with `config`
    ///
    /// # Errors
    ///
    /// `Config` if the configuration does not validate.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: MapperConfig) -> MapperResult<Self> {
        config.validate()?;
        let mut mapper = Self::new(store);
        mapper.metadata = TypeMetadataCache::new(config.metadata_cache_capacity);
        mapper.config = config;
        Ok(mapper)
    }

    /// Mapper over `store` configured from a `docmap.toml` file
    pub fn with_config_file(store: Arc<dyn DocumentStore>, path: &Path) -> MapperResult<Self> {
        Self::with_config(store, MapperConfig::from_file(path)?)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Active configuration
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Metadata cache
    pub fn metadata(&self) -> &TypeMetadataCache {
        &self.metadata
    }

    /// Constructor registry
    pub fn constructors(&self) -> &ConstructorRegistry {
        &self.constructors
    }

    /// Underlying store
    pub fn store(&self) -> &dyn DocumentStore {
        &*self.store
    }

    /// Id strategies
    pub fn strategies(&self) -> &IdStrategies {
        &self.strategies
    }

    /// Reference resolver
    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Post-commit hooks
    pub fn hooks(&self) -> &HookList {
        &self.hooks
    }

    /// Append a post-commit listener
    pub fn add_listener(&self, listener: Arc<dyn EntityListener>) {
        self.hooks.register(listener);
    }

    // ------------------------------------------------------------------------
    // Types and ids
    // ------------------------------------------------------------------------

    /// Build and cache the metadata and constructor of `T`
    ///
    /// Required before entities of `T` are handled only as `dyn Entity`,
    /// for example as the runtime type behind a base-typed reference.
    pub fn register<T: Entity>(&self) -> MapperResult<Arc<EntityType>> {
        let handle = TypeHandle::of::<T>();
        let ty = self.metadata.get(handle)?;
        self.constructors.register(handle);
        Ok(ty)
    }

    /// Metadata of the runtime type of `entity`
    pub fn type_of(&self, entity: &dyn Entity) -> MapperResult<Arc<EntityType>> {
        self.metadata
            .get_by_type_id(entity.entity_type_id(), entity.entity_type_name())
    }

    /// String-form id of `entity`, `None` while it is empty
    pub fn id_of(&self, entity: &dyn Entity) -> MapperResult<Option<String>> {
        let ty = self.type_of(entity)?;
        Ok(self.native_id_of(&ty, entity)?.map(|id| id.to_string()))
    }

    /// Native form of a string id of `T`
    pub fn parse_id<T: Entity>(&self, id: &str) -> MapperResult<NativeId> {
        let ty = self.register::<T>()?;
        self.parse_id_of(&ty, id)
    }

    /// Fresh instance of a registered type
    pub fn new_instance(&self, handle: TypeHandle) -> MapperResult<Box<dyn Entity>> {
        self.constructors.new_instance(handle)
    }

    /// Wire names read by default; lazy and ignored fields are left out
    pub fn default_projection<T: Entity>(&self) -> MapperResult<Vec<String>> {
        Ok(self.register::<T>()?.default_projection())
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Encode `entity`, persisting cascaded references
    ///
    /// An empty identifier is filled in on `entity`.
    pub fn to_document<T: Entity>(&self, entity: &mut T) -> MapperResult<Document> {
        self.register::<T>()?;
        self.to_document_with(entity, false)
    }

    /// Encode a registered entity
    ///
    /// With `skip_cascade_persist` referenced entities are never written;
    /// a reference without an id then fails with `UnsavedEntity`.
    pub fn to_document_with(
        &self,
        entity: &mut dyn Entity,
        skip_cascade_persist: bool,
    ) -> MapperResult<Document> {
        let ty = self.type_of(entity)?;
        let mut cx = EncodeContext::new(self, skip_cascade_persist);
        self.encode_entity(&mut cx, &ty, entity)
    }

    /// Decode a document into a `T`
    pub fn from_document<T: Entity>(&self, doc: &Document) -> MapperResult<T> {
        self.register::<T>()?;
        let entity = self.from_document_with(TypeHandle::of::<T>(), doc, false)?;
        downcast_entity::<T>(entity).map_err(|_| MapperError::ConstructionError {
            type_name: TypeHandle::of::<T>().simple_name().to_string(),
        })
    }

    /// Decode a document into a fresh instance of `handle`
    ///
    /// With `skip_cascade_read` every reference decodes to a stub.
    pub fn from_document_with(
        &self,
        handle: TypeHandle,
        doc: &Document,
        skip_cascade_read: bool,
    ) -> MapperResult<Box<dyn Entity>> {
        let mut cx = DecodeContext::new(self);
        let mut entity = self.decode_entity(&mut cx, handle, doc)?;
        if !skip_cascade_read {
            let ty = self.metadata.get(handle)?;
            let mut owners: [&mut dyn Entity; 1] = [entity.as_mut()];
            CascadeOrchestrator::new(self).resolve_reads(&ty, &mut owners, 0)?;
        }
        Ok(entity)
    }

    /// Decode several documents into `T`, resolving their `READ`
    /// references together
    pub fn from_documents<T: Entity>(&self, docs: &[Document]) -> MapperResult<Vec<T>> {
        let ty = self.register::<T>()?;
        let mut entities = docs
            .iter()
            .map(|doc| {
                let entity = self.from_document_with(ty.handle(), doc, true)?;
                downcast_entity::<T>(entity).map_err(|_| MapperError::ConstructionError {
                    type_name: ty.type_name().to_string(),
                })
            })
            .collect::<MapperResult<Vec<T>>>()?;
        let mut owners: Vec<&mut dyn Entity> = entities
            .iter_mut()
            .map(|e| e as &mut dyn Entity)
            .collect();
        CascadeOrchestrator::new(self).resolve_reads(&ty, &mut owners, 0)?;
        Ok(entities)
    }

    // ------------------------------------------------------------------------
    // Store round trips
    // ------------------------------------------------------------------------

    /// Insert `entity` and return its id
    pub fn insert<T: Entity>(&self, entity: &mut T) -> MapperResult<NativeId> {
        let ty = self.register::<T>()?;
        self.write(&ty, entity, HookEvent::Insert)
    }

    /// Insert `entity` when its id is empty, replace it otherwise
    pub fn save<T: Entity>(&self, entity: &mut T) -> MapperResult<NativeId> {
        let ty = self.register::<T>()?;
        let event = match self.native_id_of(&ty, entity)? {
            Some(_) => HookEvent::Update,
            None => HookEvent::Insert,
        };
        self.write(&ty, entity, event)
    }

    /// Delete `entity` after its `DELETE` dependents
    ///
    /// Returns whether the entity itself was stored.
    ///
    /// # Errors
    ///
    /// `UnsavedEntity` if the entity has no id.
    pub fn remove<T: Entity>(&self, entity: &T) -> MapperResult<bool> {
        let ty = self.register::<T>()?;
        let collection = ty.collection()?;
        let id = self
            .native_id_of(&ty, entity)?
            .ok_or_else(|| MapperError::UnsavedEntity {
                type_name: ty.type_name().to_string(),
            })?;

        let dependents = CascadeOrchestrator::new(self).delete_dependents(&ty, entity)?;
        let removed = self
            .store
            .delete_by_ids(collection, std::slice::from_ref(&id))?
            > 0;
        debug!(
            target: "docmap::store",
            type_name = ty.type_name(),
            collection,
            id = %id,
            removed,
            dependents,
            "Removed entity"
        );
        if removed {
            self.hooks.fire(HookEvent::Remove, &ty, entity);
        }
        Ok(removed)
    }

    /// Load and remove the `T` stored under `id`
    pub fn remove_by_id<T: Entity>(&self, id: &str) -> MapperResult<bool> {
        match self.find_by_id::<T>(id)? {
            Some(entity) => self.remove(&entity),
            None => Ok(false),
        }
    }

    /// The `T` stored under `id`
    pub fn find_by_id<T: Entity>(&self, id: &str) -> MapperResult<Option<T>> {
        let ty = self.register::<T>()?;
        let native = self.parse_id_of(&ty, id)?;
        match self.store.find_by_id(ty.collection()?, &native)? {
            Some(doc) => self.from_document::<T>(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Every stored `T` among `ids`, in the store's order
    ///
    /// `READ` references of all results are resolved with one store call
    /// per target collection and level.
    pub fn find_by_ids<T: Entity>(&self, ids: &[&str]) -> MapperResult<Vec<T>> {
        let ty = self.register::<T>()?;
        let natives = ids
            .iter()
            .map(|id| self.parse_id_of(&ty, id))
            .collect::<MapperResult<Vec<_>>>()?;
        let docs = self.store.find_by_ids(ty.collection()?, &natives, None)?;
        self.from_documents(&docs)
    }

    /// Number of stored `T`
    pub fn count<T: Entity>(&self) -> MapperResult<u64> {
        let ty = self.register::<T>()?;
        Ok(self.store.count_all(ty.collection()?)?)
    }

    // ------------------------------------------------------------------------
    // Cascades
    // ------------------------------------------------------------------------

    /// Resolve the references along each dotted path of `paths`
    pub fn fetch_cascade<T: Entity>(&self, entity: &mut T, paths: &[&str]) -> MapperResult<()> {
        let ty = self.register::<T>()?;
        let orchestrator = CascadeOrchestrator::new(self);
        for path in paths {
            let mut owners: [&mut dyn Entity; 1] = [&mut *entity];
            orchestrator.fetch(&ty, &mut owners, path)?;
        }
        Ok(())
    }

    /// Resolve the references along each path for all of `entities` at once
    ///
    /// Each path level costs one store call per target collection.
    pub fn fetch_cascade_all<T: Entity>(&self, entities: &mut [T], paths: &[&str]) -> MapperResult<()> {
        let ty = self.register::<T>()?;
        let orchestrator = CascadeOrchestrator::new(self);
        for path in paths {
            let mut owners: Vec<&mut dyn Entity> = entities
                .iter_mut()
                .map(|e| e as &mut dyn Entity)
                .collect();
            orchestrator.fetch(&ty, &mut owners, path)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals shared with the codecs and the orchestrator
    // ------------------------------------------------------------------------

    fn write(&self, ty: &EntityType, entity: &mut dyn Entity, event: HookEvent) -> MapperResult<NativeId> {
        let collection = ty.collection()?;
        let mut cx = EncodeContext::new(self, false);
        let doc = self.encode_entity(&mut cx, ty, entity)?;
        let id = self.store_document(collection, doc, event)?;
        debug!(
            target: "docmap::store",
            type_name = ty.type_name(),
            collection,
            id = %id,
            event = %event,
            "Wrote entity"
        );
        self.hooks.fire(event, ty, entity);
        Ok(id)
    }

    fn store_document(&self, collection: &str, doc: Document, event: HookEvent) -> MapperResult<NativeId> {
        if event == HookEvent::Insert {
            return Ok(self.store.insert(collection, doc)?);
        }
        let id = doc
            .id()
            .and_then(NativeId::from_value)
            .ok_or_else(|| docmap_core::Error::MissingId(collection.to_string()))?;
        self.store.save(collection, doc)?;
        Ok(id)
    }

    /// Encode with an existing context; the identifier goes first
    pub(crate) fn encode_entity(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        entity: &mut dyn Entity,
    ) -> MapperResult<Document> {
        let mut doc = Document::new();
        if let Some(id_field) = ty.fields().iter().find(|f| f.is_identifier()) {
            if let Some(wire) = id_field.codec().encode(cx, ty, id_field, entity)? {
                if let (Some(collection), Some(id)) = (ty.collection_name(), NativeId::from_value(&wire)) {
                    cx.mark_visited(collection, &id);
                }
                doc.insert(ID_KEY, wire);
            }
        }

        for field in ty.fields() {
            if field.is_identifier() || field.is_ignored() {
                continue;
            }
            let codec = field.codec();
            match codec.encode(cx, ty, field, entity) {
                Ok(Some(wire)) => {
                    doc.insert(codec.wire_name(field), wire);
                }
                Ok(None) => {}
                Err(e) if e.is_field_local() => self.skip_field(Site::new(ty, field), &e),
                Err(e) => return Err(e),
            }
        }
        Ok(doc)
    }

    /// Decode into a fresh instance with an existing context
    pub(crate) fn decode_entity(
        &self,
        cx: &mut DecodeContext<'_>,
        handle: TypeHandle,
        doc: &Document,
    ) -> MapperResult<Box<dyn Entity>> {
        let ty = self.metadata.get(handle)?;
        let mut entity = self.constructors.new_instance(handle)?;
        self.decode_into(cx, &ty, doc, entity.as_mut())?;
        Ok(entity)
    }

    pub(crate) fn decode_into(
        &self,
        cx: &mut DecodeContext<'_>,
        ty: &EntityType,
        doc: &Document,
        target: &mut dyn Entity,
    ) -> MapperResult<()> {
        for field in ty.fields() {
            if field.is_ignored() {
                continue;
            }
            match field.codec().decode(cx, ty, field, doc, target) {
                Ok(()) => {}
                Err(e) if e.is_field_local() && !field.is_identifier() => {
                    self.skip_field(Site::new(ty, field), &e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Native id of `entity`, `None` while it is empty
    pub(crate) fn native_id_of(
        &self,
        ty: &EntityType,
        entity: &dyn Entity,
    ) -> MapperResult<Option<NativeId>> {
        let field = ty.id_field()?;
        let site = Site::new(ty, field);
        match entity.get_field(field.name()).map_err(|e| site.access(e))? {
            FieldValue::Null => Ok(None),
            FieldValue::String(s) if s.is_empty() => Ok(None),
            FieldValue::String(s) => self.parse_id_of(ty, &s).map(Some),
            other => Err(site.mismatch(format!(
                "identifier must be a string, found {}",
                other.kind_name()
            ))),
        }
    }

    fn parse_id_of(&self, ty: &EntityType, id: &str) -> MapperResult<NativeId> {
        let spec = ty.id_spec().ok_or_else(|| MapperError::NoIdentifierField {
            type_name: ty.type_name().to_string(),
        })?;
        self.strategies.parse(&spec, ty.type_name(), id)
    }

    /// Instance of `ty` carrying only `id`
    pub(crate) fn stub(&self, ty: &EntityType, id: &NativeId) -> MapperResult<Box<dyn Entity>> {
        let field = ty.id_field()?;
        let mut entity = self.constructors.new_instance(ty.handle())?;
        entity
            .set_field(field.name(), FieldValue::String(id.to_string()))
            .map_err(|e| Site::new(ty, field).access(e))?;
        Ok(entity)
    }

    /// Write a referenced entity on behalf of a cascading owner
    pub(crate) fn persist_cascaded(
        &self,
        cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        entity: &mut dyn Entity,
        exists: bool,
    ) -> MapperResult<NativeId> {
        let collection = ty.collection()?;
        let doc = self.encode_entity(cx, ty, entity)?;
        let event = if exists {
            HookEvent::Update
        } else {
            HookEvent::Insert
        };
        let id = self.store_document(collection, doc, event)?;
        debug!(
            target: "docmap::cascade",
            type_name = ty.type_name(),
            collection,
            id = %id,
            event = %event,
            depth = cx.depth(),
            "Cascaded write"
        );
        self.hooks.fire(event, ty, entity);
        Ok(id)
    }

    /// Log a field the mapper could not handle and carry on
    pub(crate) fn skip_field(&self, site: Site<'_>, error: &MapperError) {
        if self.config.log_field_errors {
            warn!(
                target: "docmap::codec",
                type_name = site.owner,
                field = site.field,
                error = %error,
                "Skipping field"
            );
        } else {
            debug!(
                target: "docmap::codec",
                type_name = site.owner,
                field = site.field,
                error = %error,
                "Skipping field"
            );
        }
    }
}

impl std::fmt::Debug for EntityMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMapper")
            .field("config", &self.config)
            .field("types", &self.metadata.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}
