//! Identifier types
//!
//! This module defines:
//! - ObjectId: 96-bit generated identifier (timestamp + machine + counter)
//! - NativeId: the store's native id representation used for equality and lookup
//!
//! ## ObjectId layout
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 0..4  | seconds since the Unix epoch, big-endian  |
//! | 4..9  | per-process machine identifier            |
//! | 9..12 | per-process counter, big-endian, wrapping |
//!
//! The text form is 24 lowercase hex characters.

use byteorder::{BigEndian, ByteOrder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::Error;
use crate::value::Value;

/// Machine/process identifier, drawn once from a random UUID
static MACHINE_ID: Lazy<[u8; 5]> = Lazy::new(|| {
    let bytes = Uuid::new_v4().into_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
});

/// Counter seeded from a random UUID so two processes started in the same
/// second with colliding machine ids still diverge
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let bytes = Uuid::new_v4().into_bytes();
    AtomicU32::new(BigEndian::read_u32(&bytes[8..12]) & 0x00FF_FFFF)
});

/// 96-bit globally unique identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        BigEndian::write_u32(&mut bytes[0..4], secs);
        bytes[4..9].copy_from_slice(&*MACHINE_ID);
        let mut tail = [0u8; 4];
        BigEndian::write_u32(&mut tail, counter);
        bytes[9..12].copy_from_slice(&tail[1..4]);
        ObjectId(bytes)
    }

    /// Build from raw bytes
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Raw bytes
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse from the 24-character hex form
    pub fn parse_str(s: &str) -> Result<Self, Error> {
        if s.len() != 24 {
            return Err(Error::InvalidObjectId(s.to_string()));
        }
        let decoded = hex::decode(s).map_err(|_| Error::InvalidObjectId(s.to_string()))?;
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(&decoded);
        Ok(ObjectId(bytes))
    }

    /// Check whether `s` is a well-formed hex object id
    pub fn is_valid(s: &str) -> bool {
        Self::parse_str(s).is_ok()
    }

    /// Seconds since the epoch at which this id was generated
    pub fn timestamp_secs(&self) -> u32 {
        BigEndian::read_u32(&self.0[0..4])
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

/// The store's native id representation
///
/// Generated ids are `ObjectId`, auto-increment ids are `Long`, and
/// caller-supplied ids are kept as `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NativeId {
    /// Generated 96-bit id
    ObjectId(ObjectId),
    /// Monotonic integer id
    Long(i64),
    /// Caller-supplied id
    String(String),
}

impl NativeId {
    /// Convert into the wire value stored under `_id`
    pub fn to_value(&self) -> Value {
        match self {
            NativeId::ObjectId(oid) => Value::ObjectId(*oid),
            NativeId::Long(n) => Value::Int(*n),
            NativeId::String(s) => Value::String(s.clone()),
        }
    }

    /// Read a native id back from a wire value
    ///
    /// Returns None for values that cannot be ids (null, floats, containers).
    pub fn from_value(value: &Value) -> Option<NativeId> {
        match value {
            Value::ObjectId(oid) => Some(NativeId::ObjectId(*oid)),
            Value::Int(n) => Some(NativeId::Long(*n)),
            Value::String(s) => Some(NativeId::String(s.clone())),
            _ => None,
        }
    }

    /// Get as i64 if this is a Long id
    pub fn as_long(&self) -> Option<i64> {
        match self {
            NativeId::Long(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeId::ObjectId(oid) => write!(f, "{}", oid),
            NativeId::Long(n) => write!(f, "{}", n),
            NativeId::String(s) => f.write_str(s),
        }
    }
}

impl From<ObjectId> for NativeId {
    fn from(oid: ObjectId) -> Self {
        NativeId::ObjectId(oid)
    }
}

impl From<i64> for NativeId {
    fn from(n: i64) -> Self {
        NativeId::Long(n)
    }
}

impl From<&str> for NativeId {
    fn from(s: &str) -> Self {
        NativeId::String(s.to_string())
    }
}

impl From<String> for NativeId {
    fn from(s: String) -> Self {
        NativeId::String(s)
    }
}
