//! Entity metadata
//!
//! - `field_type`: declared field types
//! - `annotation`: field markers and their options
//! - `classify`: marker to role classification
//! - `descriptor`: built field descriptors
//! - `entity_type`: per-type field tables and their builder
//! - `cache`: the metadata cache
//! - `constructor`: the constructor registry

mod annotation;
mod cache;
mod classify;
mod constructor;
mod descriptor;
mod entity_type;
mod field_type;

pub use annotation::{CascadeSpec, IdKind, IdSpec, Marker, RefOptions};
pub use cache::{CacheStats, TypeMetadataCache};
pub use classify::{classify, Classification, FieldRole, ReferenceSpec};
pub use constructor::ConstructorRegistry;
pub use descriptor::{FieldDecl, FieldDescriptor};
pub use entity_type::{EntityType, EntityTypeBuilder};
pub use field_type::{ContainerKind, FieldType, ScalarKind};
