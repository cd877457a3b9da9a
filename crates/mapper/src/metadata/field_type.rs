//! Declared field types
//!
//! The declared type tells the codecs what shape a field has, including
//! element types of containers (the information reflection would read
//! from generic parameters).

use std::fmt;

use crate::entity::{Entity, TypeHandle};

/// Leaf scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    Byte,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `char`
    Char,
    /// `String`
    String,
    /// `DateTime<Utc>`
    Date,
    /// `NaiveDateTime`
    Timestamp,
    /// `Vec<u8>`, stored as a binary blob
    Binary,
}

impl ScalarKind {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Byte => "byte",
            ScalarKind::Short => "short",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Char => "char",
            ScalarKind::String => "string",
            ScalarKind::Date => "date",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Binary => "binary",
        }
    }
}

/// Collection flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered, duplicates kept
    List,
    /// Unordered, duplicates removed
    Set,
    /// FIFO queue
    Queue,
    /// Double-ended queue
    Deque,
}

impl ContainerKind {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Set => "set",
            ContainerKind::Queue => "queue",
            ContainerKind::Deque => "deque",
        }
    }
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Single scalar
    Scalar(ScalarKind),
    /// Fixed array; nests for multi-dimensional arrays
    Array(Box<FieldType>),
    /// List, set, queue or deque
    Collection(ContainerKind, Box<FieldType>),
    /// String-keyed map
    Map(Box<FieldType>),
    /// Another mapped type
    Entity(TypeHandle),
}

impl FieldType {
    /// `bool`
    pub fn bool() -> Self {
        FieldType::Scalar(ScalarKind::Bool)
    }

    /// `i8`
    pub fn byte() -> Self {
        FieldType::Scalar(ScalarKind::Byte)
    }

    /// `i16`
    pub fn short() -> Self {
        FieldType::Scalar(ScalarKind::Short)
    }

    /// `i32`
    pub fn int() -> Self {
        FieldType::Scalar(ScalarKind::Int)
    }

    /// `i64`
    pub fn long() -> Self {
        FieldType::Scalar(ScalarKind::Long)
    }

    /// `f32`
    pub fn float() -> Self {
        FieldType::Scalar(ScalarKind::Float)
    }

    /// `f64`
    pub fn double() -> Self {
        FieldType::Scalar(ScalarKind::Double)
    }

    /// `char`
    pub fn char() -> Self {
        FieldType::Scalar(ScalarKind::Char)
    }

    /// `String`
    pub fn string() -> Self {
        FieldType::Scalar(ScalarKind::String)
    }

    /// `DateTime<Utc>`
    pub fn date() -> Self {
        FieldType::Scalar(ScalarKind::Date)
    }

    /// `NaiveDateTime`
    pub fn timestamp() -> Self {
        FieldType::Scalar(ScalarKind::Timestamp)
    }

    /// `Vec<u8>` as a binary blob
    pub fn binary() -> Self {
        FieldType::Scalar(ScalarKind::Binary)
    }

    /// Array of `element`
    pub fn array(element: FieldType) -> Self {
        FieldType::Array(Box::new(element))
    }

    /// List of `element`
    pub fn list(element: FieldType) -> Self {
        FieldType::Collection(ContainerKind::List, Box::new(element))
    }

    /// Set of `element`
    pub fn set(element: FieldType) -> Self {
        FieldType::Collection(ContainerKind::Set, Box::new(element))
    }

    /// Queue of `element`
    pub fn queue(element: FieldType) -> Self {
        FieldType::Collection(ContainerKind::Queue, Box::new(element))
    }

    /// Deque of `element`
    pub fn deque(element: FieldType) -> Self {
        FieldType::Collection(ContainerKind::Deque, Box::new(element))
    }

    /// String-keyed map of `value`
    pub fn map(value: FieldType) -> Self {
        FieldType::Map(Box::new(value))
    }

    /// Mapped type `T`
    pub fn entity<T: Entity>() -> Self {
        FieldType::Entity(TypeHandle::of::<T>())
    }

    /// Byte arrays are blobs, not lists of numbers
    pub fn is_binary(&self) -> bool {
        match self {
            FieldType::Scalar(ScalarKind::Binary) => true,
            FieldType::Array(inner) => **inner == FieldType::Scalar(ScalarKind::Byte),
            _ => false,
        }
    }

    /// Whether this is an array, collection or map
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            FieldType::Array(_) | FieldType::Collection(..) | FieldType::Map(_)
        )
    }

    /// Innermost element type
    pub fn leaf(&self) -> &FieldType {
        match self {
            FieldType::Array(inner) | FieldType::Collection(_, inner) | FieldType::Map(inner) => {
                inner.leaf()
            }
            other => other,
        }
    }

    /// Handle of the innermost element when it is a mapped type
    pub fn leaf_entity(&self) -> Option<TypeHandle> {
        match self.leaf() {
            FieldType::Entity(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl From<ScalarKind> for FieldType {
    fn from(kind: ScalarKind) -> Self {
        FieldType::Scalar(kind)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(kind) => f.write_str(kind.name()),
            FieldType::Array(inner) => write!(f, "{}[]", inner),
            FieldType::Collection(kind, inner) => write!(f, "{}<{}>", kind.name(), inner),
            FieldType::Map(inner) => write!(f, "map<string, {}>", inner),
            FieldType::Entity(handle) => f.write_str(handle.simple_name()),
        }
    }
}
