//! Scalar codecs
//!
//! The wire model has one integer type (64-bit) and one float type
//! (double). Decoding into a narrower declared type goes through the
//! value's text form, so `3.0` becomes a `short` 3 while `3.5` or `70000`
//! are rejected instead of being truncated.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{TimeZone, Utc};
use docmap_core::{Document, Value};
use indexmap::IndexSet;

use super::{DecodeContext, EncodeContext, FieldCodec, Site};
use crate::entity::Entity;
use crate::error::MapperResult;
use crate::field_value::FieldValue;
use crate::metadata::{ContainerKind, EntityType, FieldDescriptor, FieldType, ScalarKind};

/// Conversion of one scalar shape between field value and wire value
///
/// Errors are plain descriptions; the field codec adds type and field.
pub trait ScalarCodec: Send + Sync + fmt::Debug {
    /// Name of the handled shape
    fn name(&self) -> &'static str;

    /// In-memory to wire
    fn to_wire(&self, value: FieldValue) -> Result<Value, String>;

    /// Wire to in-memory
    fn from_wire(&self, value: &Value) -> Result<FieldValue, String>;
}

fn unexpected(expected: &str, found: &str) -> String {
    format!("expected {}, found {}", expected, found)
}

#[derive(Debug)]
struct BoolCodec;

impl ScalarCodec for BoolCodec {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::Bool(b) => Ok(Value::Bool(b)),
            other => Err(unexpected("bool", other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        match value {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Int(n) => Ok(FieldValue::Bool(*n != 0)),
            Value::String(s) => s
                .trim()
                .parse::<bool>()
                .map(FieldValue::Bool)
                .map_err(|_| format!("cannot read '{}' as bool", s)),
            other => Err(unexpected("bool", other.type_name())),
        }
    }
}

#[derive(Debug)]
struct IntegralCodec {
    kind: ScalarKind,
}

impl IntegralCodec {
    fn narrow(&self, text: &str) -> Result<FieldValue, String> {
        let parsed = match self.kind {
            ScalarKind::Byte => text.parse::<i8>().map(FieldValue::Byte).ok(),
            ScalarKind::Short => text.parse::<i16>().map(FieldValue::Short).ok(),
            ScalarKind::Int => text.parse::<i32>().map(FieldValue::Int).ok(),
            _ => text.parse::<i64>().map(FieldValue::Long).ok(),
        };
        parsed.ok_or_else(|| format!("cannot represent '{}' as {}", text, self.kind.name()))
    }
}

impl ScalarCodec for IntegralCodec {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::Byte(v) => Ok(Value::Int(v as i64)),
            FieldValue::Short(v) => Ok(Value::Int(v as i64)),
            FieldValue::Int(v) => Ok(Value::Int(v as i64)),
            FieldValue::Long(v) => Ok(Value::Int(v)),
            other => Err(unexpected(self.kind.name(), other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        let text = match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.trim().to_string(),
            other => return Err(unexpected(self.kind.name(), other.type_name())),
        };
        self.narrow(&text)
    }
}

#[derive(Debug)]
struct FloatCodec {
    double: bool,
}

impl ScalarCodec for FloatCodec {
    fn name(&self) -> &'static str {
        if self.double {
            "double"
        } else {
            "float"
        }
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            // Through text, so 0.1f32 is stored as 0.1 rather than 0.10000000149
            FieldValue::Float(f) => Ok(Value::Float(
                f.to_string().parse::<f64>().unwrap_or(f as f64),
            )),
            FieldValue::Double(d) => Ok(Value::Float(d)),
            other => Err(unexpected(self.name(), other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        let text = match value {
            Value::Float(f) => f.to_string(),
            Value::Int(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            other => return Err(unexpected(self.name(), other.type_name())),
        };
        let invalid = || format!("cannot represent '{}' as {}", text, self.name());
        if self.double {
            text.parse::<f64>().map(FieldValue::Double).map_err(|_| invalid())
        } else {
            text.parse::<f32>().map(FieldValue::Float).map_err(|_| invalid())
        }
    }
}

#[derive(Debug)]
struct CharCodec;

impl ScalarCodec for CharCodec {
    fn name(&self) -> &'static str {
        "char"
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::Char(c) => Ok(Value::String(c.to_string())),
            other => Err(unexpected("char", other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(FieldValue::Char(c)),
                    (None, _) => Err("empty string for char".to_string()),
                    (Some(_), Some(_)) => Err(format!("'{}' is longer than one char", s)),
                }
            }
            other => Err(unexpected("char", other.type_name())),
        }
    }
}

#[derive(Debug)]
struct StringCodec;

impl ScalarCodec for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::String(s) => Ok(Value::String(s)),
            FieldValue::Char(c) => Ok(Value::String(c.to_string())),
            other => Err(unexpected("string", other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        match value {
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::ObjectId(oid) => Ok(FieldValue::String(oid.to_hex())),
            other => Err(unexpected("string", other.type_name())),
        }
    }
}

/// Dates and timestamps share the epoch-millisecond wire form
#[derive(Debug)]
struct DateCodec {
    timestamp: bool,
}

impl ScalarCodec for DateCodec {
    fn name(&self) -> &'static str {
        if self.timestamp {
            "timestamp"
        } else {
            "date"
        }
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::Date(dt) => Ok(Value::DateTime(dt.timestamp_millis())),
            FieldValue::Timestamp(naive) => {
                Ok(Value::DateTime(Utc.from_utc_datetime(&naive).timestamp_millis()))
            }
            other => Err(unexpected(self.name(), other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        let millis = match value {
            Value::DateTime(ms) | Value::Int(ms) => *ms,
            other => return Err(unexpected(self.name(), other.type_name())),
        };
        let dt = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| format!("{} ms is out of range for {}", millis, self.name()))?;
        if self.timestamp {
            Ok(FieldValue::Timestamp(dt.naive_utc()))
        } else {
            Ok(FieldValue::Date(dt))
        }
    }
}

#[derive(Debug)]
struct BinaryCodec;

impl ScalarCodec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        match value {
            FieldValue::Binary(bytes) => Ok(Value::Bytes(bytes)),
            FieldValue::Seq(items) => items
                .into_iter()
                .map(|item| match item {
                    FieldValue::Byte(b) => Ok(b as u8),
                    other => Err(unexpected("byte", other.kind_name())),
                })
                .collect::<Result<Vec<u8>, String>>()
                .map(Value::Bytes),
            other => Err(unexpected("binary", other.kind_name())),
        }
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        match value {
            Value::Bytes(bytes) => Ok(FieldValue::Binary(bytes.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Int(n) if (-128..=255).contains(n) => Ok(*n as u8),
                    other => Err(unexpected("byte", other.type_name())),
                })
                .collect::<Result<Vec<u8>, String>>()
                .map(FieldValue::Binary),
            other => Err(unexpected("binary", other.type_name())),
        }
    }
}

/// Set membership view of a wire value
///
/// Floats compare by bit pattern after folding `-0.0` into `0.0` and every
/// NaN into one, so a set never holds two NaNs.
struct SetKey<V: Borrow<Value>>(V);

fn float_key(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

fn same_member(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => float_key(*x) == float_key(*y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_member(a, b))
        }
        (Value::Document(x), Value::Document(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && same_member(va, vb))
        }
        (a, b) => a == b,
    }
}

fn hash_member<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Int(n) | Value::DateTime(n) => n.hash(state),
        Value::Float(f) => float_key(*f).hash(state),
        Value::String(s) => s.hash(state),
        Value::Bytes(b) => b.hash(state),
        Value::ObjectId(id) => id.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_member(item, state);
            }
        }
        Value::Document(doc) => {
            doc.len().hash(state);
            for (key, item) in doc.iter() {
                key.hash(state);
                hash_member(item, state);
            }
        }
        Value::Ref(r) => r.hash(state),
    }
}

impl<V: Borrow<Value>> PartialEq for SetKey<V> {
    fn eq(&self, other: &Self) -> bool {
        same_member(self.0.borrow(), other.0.borrow())
    }
}

impl<V: Borrow<Value>> Eq for SetKey<V> {}

impl<V: Borrow<Value>> Hash for SetKey<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_member(self.0.borrow(), state)
    }
}

/// First occurrence of every distinct value, in order
fn distinct<V: Borrow<Value>>(items: impl IntoIterator<Item = V>) -> Vec<V> {
    items
        .into_iter()
        .map(SetKey)
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(|key| key.0)
        .collect()
}

/// Arrays (flavor `None`) and collections
#[derive(Debug)]
struct SeqCodec {
    flavor: Option<ContainerKind>,
    element: Box<dyn ScalarCodec>,
}

impl SeqCodec {
    fn dedupes(&self) -> bool {
        self.flavor == Some(ContainerKind::Set)
    }
}

impl ScalarCodec for SeqCodec {
    fn name(&self) -> &'static str {
        match self.flavor {
            Some(kind) => kind.name(),
            None => "array",
        }
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        let items = match value {
            FieldValue::Seq(items) => items,
            other => return Err(unexpected(self.name(), other.kind_name())),
        };
        let mut out: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            out.push(match item {
                FieldValue::Null => Value::Null,
                item => self.element.to_wire(item)?,
            });
        }
        if self.dedupes() {
            out = distinct(out);
        }
        Ok(Value::Array(out))
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(unexpected(self.name(), other.type_name())),
        };
        let items: Vec<&Value> = if self.dedupes() {
            distinct(items.iter())
        } else {
            items.iter().collect()
        };
        let mut out: Vec<FieldValue> = Vec::with_capacity(items.len());
        for item in items {
            out.push(match item {
                Value::Null => FieldValue::Null,
                item => self.element.from_wire(item)?,
            });
        }
        Ok(FieldValue::Seq(out))
    }
}

#[derive(Debug)]
struct MapCodec {
    value: Box<dyn ScalarCodec>,
}

impl ScalarCodec for MapCodec {
    fn name(&self) -> &'static str {
        "map"
    }

    fn to_wire(&self, value: FieldValue) -> Result<Value, String> {
        let entries = match value {
            FieldValue::Map(entries) => entries,
            other => return Err(unexpected("map", other.kind_name())),
        };
        let mut doc = Document::new();
        for (key, item) in entries {
            let wire = match item {
                FieldValue::Null => Value::Null,
                item => self.value.to_wire(item)?,
            };
            doc.insert(key, wire);
        }
        Ok(Value::Document(doc))
    }

    fn from_wire(&self, value: &Value) -> Result<FieldValue, String> {
        let doc = match value {
            Value::Document(doc) => doc,
            other => return Err(unexpected("map", other.type_name())),
        };
        let mut out = BTreeMap::new();
        for (key, item) in doc {
            let decoded = match item {
                Value::Null => FieldValue::Null,
                item => self.value.from_wire(item)?,
            };
            out.insert(key.clone(), decoded);
        }
        Ok(FieldValue::Map(out))
    }
}

/// Scalar codec for a declared type; `None` if it holds entities
pub fn scalar_codec_for(field_type: &FieldType) -> Option<Box<dyn ScalarCodec>> {
    if field_type.is_binary() {
        return Some(Box::new(BinaryCodec));
    }
    let codec: Box<dyn ScalarCodec> = match field_type {
        FieldType::Scalar(kind) => match kind {
            ScalarKind::Bool => Box::new(BoolCodec),
            ScalarKind::Byte | ScalarKind::Short | ScalarKind::Int | ScalarKind::Long => {
                Box::new(IntegralCodec { kind: *kind })
            }
            ScalarKind::Float => Box::new(FloatCodec { double: false }),
            ScalarKind::Double => Box::new(FloatCodec { double: true }),
            ScalarKind::Char => Box::new(CharCodec),
            ScalarKind::String => Box::new(StringCodec),
            ScalarKind::Date => Box::new(DateCodec { timestamp: false }),
            ScalarKind::Timestamp => Box::new(DateCodec { timestamp: true }),
            ScalarKind::Binary => Box::new(BinaryCodec),
        },
        FieldType::Array(inner) => Box::new(SeqCodec {
            flavor: None,
            element: scalar_codec_for(inner)?,
        }),
        FieldType::Collection(kind, inner) => Box::new(SeqCodec {
            flavor: Some(*kind),
            element: scalar_codec_for(inner)?,
        }),
        FieldType::Map(inner) => Box::new(MapCodec {
            value: scalar_codec_for(inner)?,
        }),
        FieldType::Entity(_) => return None,
    };
    Some(codec)
}

/// Field codec for the Scalar role
#[derive(Debug)]
pub struct ScalarFieldCodec {
    inner: Box<dyn ScalarCodec>,
}

impl ScalarFieldCodec {
    /// Wrap a scalar codec
    pub fn new(inner: Box<dyn ScalarCodec>) -> Self {
        ScalarFieldCodec { inner }
    }
}

impl FieldCodec for ScalarFieldCodec {
    fn kind(&self) -> &'static str {
        "scalar"
    }

    fn encode(
        &self,
        _cx: &mut EncodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        owner: &mut dyn Entity,
    ) -> MapperResult<Option<Value>> {
        let site = Site::new(ty, field);
        let value = owner.get_field(field.name()).map_err(|e| site.access(e))?;
        if !self.is_emittable(&value) {
            return Ok(None);
        }
        self.inner
            .to_wire(value)
            .map(Some)
            .map_err(|detail| site.mismatch(detail))
    }

    fn decode(
        &self,
        _cx: &mut DecodeContext<'_>,
        ty: &EntityType,
        field: &FieldDescriptor,
        doc: &Document,
        target: &mut dyn Entity,
    ) -> MapperResult<()> {
        let Some(raw) = doc.get(self.wire_name(field)) else {
            return Ok(());
        };
        let site = Site::new(ty, field);
        let value = match raw {
            Value::Null => FieldValue::Null,
            raw => self
                .inner
                .from_wire(raw)
                .map_err(|detail| site.mismatch(detail))?,
        };
        target
            .set_field(field.name(), value)
            .map_err(|e| site.access(e))
    }
}
