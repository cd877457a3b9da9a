//! In-memory field values
//!
//! `FieldValue` is what an entity hands the mapper from `get_field` and what
//! it receives in `set_field`. It keeps the declared width of numbers
//! (`Short` stays `Short`), unlike the wire [`Value`](docmap_core::Value)
//! which only knows 64-bit integers and doubles.
//!
//! Conversions:
//! - `From<T> for FieldValue` for primitives, strings, chrono types and
//!   containers of convertible elements
//! - [`FromFieldValue`] plus [`take`] for the way back
//! - entity helpers ([`FieldValue::entity`], [`take_entity`], ...) for
//!   embedded and referenced fields

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::entity::{downcast_entity, Entity, FieldAccessError};

/// Typed in-memory value of one field
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Single character
    Char(char),
    /// UTF-8 string
    String(String),
    /// Instant in UTC
    Date(DateTime<Utc>),
    /// Wall-clock timestamp without zone
    Timestamp(NaiveDateTime),
    /// Byte array
    Binary(Vec<u8>),
    /// Contents of a list, set, queue, deque or array
    Seq(Vec<FieldValue>),
    /// String-keyed map
    Map(BTreeMap<String, FieldValue>),
    /// Nested or referenced entity
    Entity(Box<dyn Entity>),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Seq(a), Seq(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Entity(a), Entity(b)) => a.entity_eq(&**b),
            _ => false,
        }
    }
}

impl FieldValue {
    /// Kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Byte(_) => "byte",
            FieldValue::Short(_) => "short",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Float(_) => "float",
            FieldValue::Double(_) => "double",
            FieldValue::Char(_) => "char",
            FieldValue::String(_) => "string",
            FieldValue::Date(_) => "date",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Binary(_) => "binary",
            FieldValue::Seq(_) => "sequence",
            FieldValue::Map(_) => "map",
            FieldValue::Entity(_) => "entity",
        }
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Borrow the string content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested entity
    pub fn as_entity(&self) -> Option<&dyn Entity> {
        match self {
            FieldValue::Entity(e) => Some(&**e),
            _ => None,
        }
    }

    /// Wrap an optional entity
    pub fn entity<T: Entity>(entity: Option<T>) -> FieldValue {
        match entity {
            Some(e) => FieldValue::Entity(Box::new(e)),
            None => FieldValue::Null,
        }
    }

    /// Wrap a sequence of entities
    pub fn entities<T, I>(entities: I) -> FieldValue
    where
        T: Entity,
        I: IntoIterator<Item = T>,
    {
        FieldValue::Seq(
            entities
                .into_iter()
                .map(|e| FieldValue::Entity(Box::new(e)))
                .collect(),
        )
    }

    /// Wrap a string-keyed map of entities
    pub fn entity_map<T, I>(entries: I) -> FieldValue
    where
        T: Entity,
        I: IntoIterator<Item = (String, T)>,
    {
        FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, e)| (k, FieldValue::Entity(Box::new(e))))
                .collect(),
        )
    }
}

/// Conversion from a [`FieldValue`] into a Rust field type
pub trait FromFieldValue: Sized {
    /// Kind name reported when the conversion fails
    fn expected() -> &'static str;

    /// Convert, or `None` if the value has the wrong kind
    fn from_field_value(value: FieldValue) -> Option<Self>;
}

/// Convert a value handed to `set_field` into the field's Rust type
pub fn take<T: FromFieldValue>(field: &str, value: FieldValue) -> Result<T, FieldAccessError> {
    let found = value.kind_name();
    T::from_field_value(value).ok_or_else(|| FieldAccessError::TypeMismatch {
        field: field.to_string(),
        expected: T::expected(),
        found,
    })
}

/// Convert a binary value (byte arrays map to `Binary`, not `Seq`)
pub fn take_binary(field: &str, value: FieldValue) -> Result<Vec<u8>, FieldAccessError> {
    match value {
        FieldValue::Binary(bytes) => Ok(bytes),
        other => Err(FieldAccessError::mismatch(field, "binary", &other)),
    }
}

/// Same as [`take_binary`] for optional byte arrays
pub fn take_binary_opt(field: &str, value: FieldValue) -> Result<Option<Vec<u8>>, FieldAccessError> {
    match value {
        FieldValue::Null => Ok(None),
        other => take_binary(field, other).map(Some),
    }
}

/// Convert an embedded or referenced entity field
pub fn take_entity<T: Entity>(field: &str, value: FieldValue) -> Result<Option<T>, FieldAccessError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Entity(boxed) => downcast_entity::<T>(boxed)
            .map(Some)
            .map_err(|other| FieldAccessError::Rejected {
                field: field.to_string(),
                reason: format!("unexpected entity type {}", other.entity_type_name()),
            }),
        other => Err(FieldAccessError::mismatch(field, "entity", &other)),
    }
}

/// Convert a collection of entities into any `FromIterator` container
///
/// `Null` yields an empty container.
pub fn take_entities<T, C>(field: &str, value: FieldValue) -> Result<C, FieldAccessError>
where
    T: Entity,
    C: FromIterator<T>,
{
    match value {
        FieldValue::Null => Ok(std::iter::empty().collect()),
        FieldValue::Seq(items) => items
            .into_iter()
            .map(|item| {
                take_entity::<T>(field, item)?.ok_or_else(|| FieldAccessError::Rejected {
                    field: field.to_string(),
                    reason: "null element in entity collection".to_string(),
                })
            })
            .collect(),
        other => Err(FieldAccessError::mismatch(field, "sequence", &other)),
    }
}

/// Convert a string-keyed map of entities
pub fn take_entity_map<T, M>(field: &str, value: FieldValue) -> Result<M, FieldAccessError>
where
    T: Entity,
    M: FromIterator<(String, T)>,
{
    match value {
        FieldValue::Null => Ok(std::iter::empty().collect()),
        FieldValue::Map(entries) => entries
            .into_iter()
            .filter_map(|(k, v)| match take_entity::<T>(field, v) {
                Ok(Some(e)) => Some(Ok((k, e))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            })
            .collect(),
        other => Err(FieldAccessError::mismatch(field, "map", &other)),
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }

            impl FromFieldValue for $ty {
                fn expected() -> &'static str {
                    $name
                }

                fn from_field_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Bool, "bool";
    i8 => Byte, "byte";
    i16 => Short, "short";
    i32 => Int, "int";
    i64 => Long, "long";
    f32 => Float, "float";
    f64 => Double, "double";
    char => Char, "char";
    String => String, "string";
    DateTime<Utc> => Date, "date";
    NaiveDateTime => Timestamp, "timestamp";
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<Box<dyn Entity>> for FieldValue {
    fn from(e: Box<dyn Entity>) -> Self {
        FieldValue::Entity(e)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

fn seq_elements<T: FromFieldValue, C: FromIterator<T>>(value: FieldValue) -> Option<C> {
    match value {
        FieldValue::Seq(items) => items.into_iter().map(T::from_field_value).collect(),
        _ => None,
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: FromFieldValue> FromFieldValue for Vec<T> {
    fn expected() -> &'static str {
        "sequence"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        seq_elements(value)
    }
}

impl<T: Into<FieldValue>> From<VecDeque<T>> for FieldValue {
    fn from(v: VecDeque<T>) -> Self {
        FieldValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: FromFieldValue> FromFieldValue for VecDeque<T> {
    fn expected() -> &'static str {
        "sequence"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        seq_elements(value)
    }
}

impl<T: Into<FieldValue>> From<HashSet<T>> for FieldValue {
    fn from(v: HashSet<T>) -> Self {
        FieldValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: FromFieldValue + Eq + Hash> FromFieldValue for HashSet<T> {
    fn expected() -> &'static str {
        "sequence"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        seq_elements(value)
    }
}

impl<T: Into<FieldValue>> From<BTreeSet<T>> for FieldValue {
    fn from(v: BTreeSet<T>) -> Self {
        FieldValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: FromFieldValue + Ord> FromFieldValue for BTreeSet<T> {
    fn expected() -> &'static str {
        "sequence"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        seq_elements(value)
    }
}

impl<T: Into<FieldValue>> From<BTreeMap<String, T>> for FieldValue {
    fn from(v: BTreeMap<String, T>) -> Self {
        FieldValue::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: FromFieldValue> FromFieldValue for BTreeMap<String, T> {
    fn expected() -> &'static str {
        "map"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_field_value(v).map(|v| (k, v)))
                .collect(),
            _ => None,
        }
    }
}

impl<T: Into<FieldValue>> From<HashMap<String, T>> for FieldValue {
    fn from(v: HashMap<String, T>) -> Self {
        FieldValue::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: FromFieldValue> FromFieldValue for HashMap<String, T> {
    fn expected() -> &'static str {
        "map"
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_field_value(v).map(|v| (k, v)))
                .collect(),
            _ => None,
        }
    }
}
