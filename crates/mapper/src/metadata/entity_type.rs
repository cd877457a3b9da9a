//! Entity type metadata
//!
//! `EntityTypeBuilder` is what `Entity::describe` returns; `EntityType` is
//! the validated, immutable result the cache hands out.
//!
//! ## Inheritance
//!
//! `extends(parent)` appends the parent's fields after the type's own
//! fields. A field declared on the type hides a parent field of the same
//! name. Collection and embeddability come from the most derived type.

use std::collections::HashSet;
use std::fmt;

use docmap_core::SortSpec;

use super::annotation::{IdSpec, Marker, RefOptions};
use super::descriptor::{FieldDecl, FieldDescriptor};
use super::field_type::FieldType;
use crate::entity::TypeHandle;
use crate::error::{MapperError, MapperResult};

/// Field table of one type, as written in `describe`
#[derive(Debug, Clone, Default)]
pub struct EntityTypeBuilder {
    collection: Option<String>,
    embeddable: bool,
    parent: Option<TypeHandle>,
    fields: Vec<FieldDecl>,
}

impl EntityTypeBuilder {
    /// Empty table; the collection defaults to the lowercased type name
    pub fn new() -> Self {
        Self::default()
    }

    /// Store documents in `name`
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Only ever stored inside another document
    pub fn embeddable(mut self) -> Self {
        self.embeddable = true;
        self
    }

    /// Inherit the fields of `parent`
    pub fn extends(mut self, parent: TypeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declare a field with explicit markers
    pub fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        markers: impl IntoIterator<Item = Marker>,
    ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            field_type,
            markers: markers.into_iter().collect(),
        });
        self
    }

    /// Identifier field (declared as string)
    pub fn id(self, name: impl Into<String>, spec: IdSpec) -> Self {
        self.field(name, FieldType::string(), [Marker::Id(spec)])
    }

    /// Unmarked scalar
    pub fn property(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(name, field_type, std::iter::empty())
    }

    /// Scalar left out of default projections
    pub fn lazy_property(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(name, field_type, [Marker::lazy()])
    }

    /// Embedded sub-document
    pub fn embedded(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(name, field_type, [Marker::embed()])
    }

    /// Container of embedded sub-documents
    pub fn embedded_collection(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(name, field_type, [Marker::embed_list()])
    }

    /// Single reference
    pub fn reference(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        options: RefOptions,
    ) -> Self {
        self.field(name, field_type, [Marker::Ref(options)])
    }

    /// Container of references
    pub fn reference_collection(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        options: RefOptions,
    ) -> Self {
        self.field(name, field_type, [Marker::RefList(options)])
    }

    /// Field the mapper never touches
    pub fn ignored(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(name, field_type, [Marker::Ignore])
    }
}

/// Validated metadata of one mapped type
pub struct EntityType {
    handle: TypeHandle,
    collection: Option<String>,
    fields: Vec<FieldDescriptor>,
    id_index: Option<usize>,
}

impl EntityType {
    /// Build from the type's `describe` and its ancestors
    ///
    /// # Errors
    ///
    /// - `InheritanceCycle` if the `extends` chain loops
    /// - `NoIdentifierField` for a collection type without identifier
    /// - `DuplicateIdentifierField` for two identifiers
    /// - `InvalidFieldType` for a field whose type does not fit its role
    pub fn build(handle: TypeHandle) -> MapperResult<Self> {
        let type_name = handle.simple_name();
        let own = handle.describe();

        let mut chain = HashSet::new();
        chain.insert(handle.type_id());
        let mut decls: Vec<FieldDecl> = own.fields.clone();
        let mut parent = own.parent;
        while let Some(base) = parent {
            if !chain.insert(base.type_id()) {
                return Err(MapperError::InheritanceCycle {
                    type_name: type_name.to_string(),
                });
            }
            let base_builder = base.describe();
            for decl in base_builder.fields {
                if !decls.iter().any(|d| d.name == decl.name) {
                    decls.push(decl);
                }
            }
            parent = base_builder.parent;
        }

        let collection = if own.embeddable {
            None
        } else {
            Some(
                own.collection
                    .unwrap_or_else(|| type_name.to_ascii_lowercase()),
            )
        };

        let mut fields = Vec::with_capacity(decls.len());
        let mut id_index: Option<usize> = None;
        for decl in decls {
            let descriptor = FieldDescriptor::build(type_name, decl)?;
            if descriptor.is_identifier() {
                if let Some(first) = id_index {
                    let first: &FieldDescriptor = &fields[first];
                    return Err(MapperError::DuplicateIdentifierField {
                        type_name: type_name.to_string(),
                        first: first.name().to_string(),
                        second: descriptor.name().to_string(),
                    });
                }
                id_index = Some(fields.len());
            }
            fields.push(descriptor);
        }

        if collection.is_some() && id_index.is_none() {
            return Err(MapperError::NoIdentifierField {
                type_name: type_name.to_string(),
            });
        }

        Ok(EntityType {
            handle,
            collection,
            fields,
            id_index,
        })
    }

    /// Handle of the type
    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    /// Short type name used in messages
    pub fn type_name(&self) -> &'static str {
        self.handle.simple_name()
    }

    /// Collection name
    ///
    /// # Errors
    ///
    /// `NotACollection` for embeddable types.
    pub fn collection(&self) -> MapperResult<&str> {
        self.collection
            .as_deref()
            .ok_or_else(|| MapperError::NotACollection {
                type_name: self.type_name().to_string(),
            })
    }

    /// Collection name, if any
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Whether the type only lives inside other documents
    pub fn is_embeddable(&self) -> bool {
        self.collection.is_none()
    }

    /// All fields: own fields first, then inherited ones
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by declared name, then by wire name
    pub fn field(&self, name: &str) -> MapperResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .or_else(|| self.fields.iter().find(|f| f.wire_name() == name))
            .ok_or_else(|| MapperError::FieldNotFound {
                type_name: self.type_name().to_string(),
                field: name.to_string(),
            })
    }

    /// The identifier field
    pub fn id_field(&self) -> MapperResult<&FieldDescriptor> {
        self.id_index
            .map(|i| &self.fields[i])
            .ok_or_else(|| MapperError::NoIdentifierField {
                type_name: self.type_name().to_string(),
            })
    }

    /// Identifier options
    pub fn id_spec(&self) -> Option<IdSpec> {
        self.id_index.and_then(|i| match self.fields[i].role() {
            super::FieldRole::Identifier(spec) => Some(*spec),
            _ => None,
        })
    }

    /// Fields holding references
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.reference_spec().is_some())
    }

    /// Wire names read by default (lazy and ignored fields left out)
    pub fn default_projection(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.is_lazy() && !f.is_ignored())
            .map(|f| f.wire_name().to_string())
            .collect()
    }

    /// Mapped types named by embedded and reference fields
    pub fn dependencies(&self) -> Vec<TypeHandle> {
        let mut seen = Vec::new();
        for handle in self.fields.iter().filter(|f| !f.is_ignored()).filter_map(|f| f.target()) {
            if !seen.contains(&handle) {
                seen.push(handle);
            }
        }
        seen
    }

    /// Sort applied to a reference field's batched lookups
    pub fn sort_of(&self, field: &str) -> Option<&SortSpec> {
        self.field(field)
            .ok()
            .and_then(|f| f.reference_spec())
            .and_then(|spec| spec.sort.as_ref())
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("type", &self.handle.type_name())
            .field("collection", &self.collection)
            .field("fields", &self.fields)
            .finish()
    }
}
