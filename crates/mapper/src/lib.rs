//! Entity/document mapping engine
//!
//! This crate converts application entities to and from `docmap_core`
//! documents:
//! - entity: the `Entity` contract and `TypeHandle`
//! - field_value: typed in-memory field values and their conversions
//! - metadata: descriptor tables, role classification, the metadata cache
//!   and the constructor registry
//! - codec: one field codec per role, scalar codecs per kind
//! - id_strategy: Generated, AutoIncrement and UserDefined ids
//! - reference: reduced and full reference encodings
//! - cascade: batched reference fetch and delete cascades
//! - hooks: post-commit listeners
//! - config: `docmap.toml` settings
//! - mapper: the `EntityMapper` facade

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cascade;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod field_value;
pub mod hooks;
pub mod id_strategy;
pub mod mapper;
pub mod metadata;
pub mod reference;

pub use cascade::CascadeOrchestrator;
pub use codec::{DecodeContext, EncodeContext, FieldCodec, ScalarCodec};
pub use config::{MapperConfig, CONFIG_FILE_NAME};
pub use entity::{downcast_entity, Entity, EntityBase, FieldAccessError, TypeHandle};
pub use error::{MapperError, MapperResult};
pub use field_value::{
    take, take_binary, take_binary_opt, take_entities, take_entity, take_entity_map, FieldValue,
    FromFieldValue,
};
pub use hooks::{EntityListener, HookEvent, HookList};
pub use id_strategy::{AutoIncrementId, GeneratedId, IdContext, IdStrategies, IdStrategy, UserDefinedId};
pub use mapper::EntityMapper;
pub use metadata::{
    classify, CacheStats, CascadeSpec, ContainerKind, EntityType, EntityTypeBuilder,
    FieldDescriptor, FieldRole, FieldType, IdKind, IdSpec, Marker, RefOptions, ScalarKind,
    TypeMetadataCache,
};
pub use reference::{EncodingMismatch, ReferenceResolver};
