//! The entity contract
//!
//! A mapped type describes its fields once through [`Entity::describe`] and
//! exposes them by name through [`Entity::get_field`] / [`Entity::set_field`].
//! Nothing else about the type is fixed: roles come from the descriptor
//! table, not from the type's shape.
//!
//! Cloning, equality and downcasting of `dyn Entity` come from
//! [`EntityBase`], which every `Entity + Clone + PartialEq` gets for free.

use std::any::{Any, TypeId};
use std::fmt;

use thiserror::Error;

use crate::field_value::FieldValue;
use crate::metadata::EntityTypeBuilder;

/// Failure reading or writing one field on an entity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldAccessError {
    /// The entity has no accessible field with this name
    #[error("no accessible field '{0}'")]
    UnknownField(String),

    /// The value handed to `set_field` does not fit the field
    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Expected kind
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    /// The entity refused the value
    #[error("field '{field}' rejected the value: {reason}")]
    Rejected {
        /// Field name
        field: String,
        /// Reason given by the entity
        reason: String,
    },
}

impl FieldAccessError {
    /// Shorthand for [`FieldAccessError::UnknownField`]
    pub fn unknown(field: &str) -> Self {
        FieldAccessError::UnknownField(field.to_string())
    }

    /// Shorthand for [`FieldAccessError::TypeMismatch`]
    pub fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> Self {
        FieldAccessError::TypeMismatch {
            field: field.to_string(),
            expected,
            found: found.kind_name(),
        }
    }
}

/// A type the mapper can convert to and from documents
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Default)]
/// struct User { id: Option<String>, name: String }
///
/// impl Entity for User {
///     fn describe() -> EntityTypeBuilder {
///         EntityTypeBuilder::new()
///             .id("id", IdSpec::generated())
///             .property("name", FieldType::string())
///     }
///     fn instantiate() -> Option<Self> { Some(User::default()) }
///     fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
///         match name {
///             "id" => Ok(self.id.clone().into()),
///             "name" => Ok(self.name.clone().into()),
///             _ => Err(FieldAccessError::unknown(name)),
///         }
///     }
///     fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
///         match name {
///             "id" => self.id = take(name, value)?,
///             "name" => self.name = take(name, value)?,
///             _ => return Err(FieldAccessError::unknown(name)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Entity: EntityBase {
    /// Descriptor table for this type, read once by the metadata cache
    fn describe() -> EntityTypeBuilder
    where
        Self: Sized;

    /// No-argument constructor used during decode
    ///
    /// Types that return `None` can be encoded but never decoded.
    fn instantiate() -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    /// Read a field by its declared name
    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError>;

    /// Write a field by its declared name
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError>;
}

/// Object-safe helpers every entity carries
pub trait EntityBase: Send + Sync + fmt::Debug + 'static {
    /// Clone into a new box
    fn clone_entity(&self) -> Box<dyn Entity>;
    /// Borrow as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `Any` for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Convert the box into `Box<dyn Any>`
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// `TypeId` of the concrete type
    fn entity_type_id(&self) -> TypeId;
    /// Full path of the concrete type
    fn entity_type_name(&self) -> &'static str;
    /// Equality against another entity of any type
    fn entity_eq(&self, other: &dyn Entity) -> bool;
}

impl<T: Entity + Clone + PartialEq> EntityBase for T {
    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn entity_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn entity_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn entity_eq(&self, other: &dyn Entity) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        (**self).clone_entity()
    }
}

impl dyn Entity {
    /// Whether the concrete type is `T`
    pub fn is<T: Entity>(&self) -> bool {
        self.entity_type_id() == TypeId::of::<T>()
    }

    /// Downcast to a concrete reference
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete mutable reference
    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Unbox a `dyn Entity` into its concrete type
///
/// Hands the box back unchanged when the concrete type is not `T`.
pub fn downcast_entity<T: Entity>(entity: Box<dyn Entity>) -> Result<T, Box<dyn Entity>> {
    if !entity.is::<T>() {
        return Err(entity);
    }
    match entity.into_any().downcast::<T>() {
        Ok(concrete) => Ok(*concrete),
        // Unreachable after the TypeId check; the box is already consumed.
        Err(_) => unreachable!("TypeId matched but downcast failed"),
    }
}

/// Constructor signature stored in the registry
pub type Constructor = fn() -> Option<Box<dyn Entity>>;

fn construct_boxed<T: Entity>() -> Option<Box<dyn Entity>> {
    T::instantiate().map(|entity| Box::new(entity) as Box<dyn Entity>)
}

/// Copyable identity of a mapped type
///
/// Declared types of embedded and referenced fields name their target
/// through a handle, which is also how the metadata cache and the
/// constructor registry find `describe` and `instantiate` for a type they
/// only know by `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> EntityTypeBuilder,
    construct: Constructor,
}

impl TypeHandle {
    /// Handle for `T`
    pub fn of<T: Entity>() -> Self {
        TypeHandle {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
            construct: construct_boxed::<T>,
        }
    }

    /// `TypeId` of the type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full path of the type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Last path segment without generics, e.g. `User` for `app::model::User`
    pub fn simple_name(&self) -> &'static str {
        simple_name(self.type_name)
    }

    /// Run the type's `describe`
    pub fn describe(&self) -> EntityTypeBuilder {
        (self.describe)()
    }

    /// Constructor function pointer
    pub fn constructor(&self) -> Constructor {
        self.construct
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeHandle {}

impl std::hash::Hash for TypeHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.type_name)
    }
}

fn simple_name(full: &'static str) -> &'static str {
    let base = match full.find('<') {
        Some(pos) => &full[..pos],
        None => full,
    };
    match base.rfind("::") {
        Some(pos) => &base[pos + 2..],
        None => base,
    }
}
