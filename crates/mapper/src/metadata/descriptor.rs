//! Field descriptors
//!
//! Immutable once built. The codec is chosen here, once per field, so
//! encode and decode never re-dispatch on the declared type.

use std::fmt;
use std::sync::Arc;

use docmap_core::ID_KEY;

use super::annotation::{CascadeSpec, Marker};
use super::classify::{classify, FieldRole, ReferenceSpec};
use super::field_type::FieldType;
use crate::codec::{self, FieldCodec};
use crate::entity::TypeHandle;
use crate::error::{MapperError, MapperResult};

/// A field as declared by `describe`, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Declared name, as used by `get_field` / `set_field`
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Markers
    pub markers: Vec<Marker>,
}

/// Fully built description of one field
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    wire_name: String,
    field_type: FieldType,
    role: FieldRole,
    codec: Arc<dyn FieldCodec>,
}

impl FieldDescriptor {
    /// Classify, validate and pick the codec
    pub fn build(owner: &str, decl: FieldDecl) -> MapperResult<Self> {
        let classification = classify(&decl.markers);
        let role = classification.role;
        check_role_fits(owner, &decl.name, &role, &decl.field_type)?;

        let wire_name = match &role {
            FieldRole::Identifier(_) => ID_KEY.to_string(),
            _ => classification.wire_name.unwrap_or_else(|| decl.name.clone()),
        };
        let codec = codec::select(owner, &decl.name, &role, &decl.field_type)?;

        Ok(FieldDescriptor {
            name: decl.name,
            wire_name,
            field_type: decl.field_type,
            role,
            codec,
        })
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key in the document
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Declared type
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Role
    pub fn role(&self) -> &FieldRole {
        &self.role
    }

    /// Codec selected for this field
    pub fn codec(&self) -> &Arc<dyn FieldCodec> {
        &self.codec
    }

    /// Whether this is the identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self.role, FieldRole::Identifier(_))
    }

    /// Whether default projections leave this field out
    pub fn is_lazy(&self) -> bool {
        matches!(self.role, FieldRole::Scalar { lazy: true })
    }

    /// Whether this field is mapped at all
    pub fn is_ignored(&self) -> bool {
        matches!(self.role, FieldRole::Ignored)
    }

    /// Reference options, for reference roles
    pub fn reference_spec(&self) -> Option<&ReferenceSpec> {
        self.role.reference_spec()
    }

    /// Cascade flags; empty for non-reference fields
    pub fn cascade(&self) -> CascadeSpec {
        self.reference_spec()
            .map(|spec| spec.cascade)
            .unwrap_or(CascadeSpec::NONE)
    }

    /// Mapped type at the leaf of the declared type
    pub fn target(&self) -> Option<TypeHandle> {
        self.field_type.leaf_entity()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("field_type", &self.field_type)
            .field("role", &self.role)
            .field("codec", &self.codec.kind())
            .finish()
    }
}

fn check_role_fits(
    owner: &str,
    field: &str,
    role: &FieldRole,
    field_type: &FieldType,
) -> MapperResult<()> {
    let invalid = |reason: String| MapperError::InvalidFieldType {
        type_name: owner.to_string(),
        field: field.to_string(),
        reason,
    };
    match role {
        FieldRole::Identifier(_) => {
            if *field_type != FieldType::string() {
                return Err(invalid(format!(
                    "identifier must be declared as string, found {}",
                    field_type
                )));
            }
        }
        FieldRole::Scalar { .. } => {
            if field_type.leaf_entity().is_some() {
                return Err(invalid(format!(
                    "{} holds entities; mark it as embedded or reference",
                    field_type
                )));
            }
        }
        FieldRole::EmbeddedObject | FieldRole::Reference(_) => {
            if !matches!(field_type, FieldType::Entity(_)) {
                return Err(invalid(format!(
                    "{} requires an entity type, found {}",
                    role.name(),
                    field_type
                )));
            }
        }
        FieldRole::EmbeddedCollection | FieldRole::ReferenceCollection(_) => {
            if !field_type.is_container() || field_type.leaf_entity().is_none() {
                return Err(invalid(format!(
                    "{} requires a container of entities, found {}",
                    role.name(),
                    field_type
                )));
            }
        }
        FieldRole::Ignored => {}
    }
    Ok(())
}
