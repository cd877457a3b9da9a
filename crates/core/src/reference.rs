//! Full (self-describing) reference record
//!
//! A `DbRef` names the target collection alongside the target's native id,
//! so a reader can resolve it without knowing the declared type of the
//! field it came from. The reduced form is simply the native id value and
//! has no type of its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::NativeId;

/// Collection + id pointer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbRef {
    /// Target collection name
    pub collection: String,
    /// Target id in native form
    pub id: NativeId,
}

impl DbRef {
    /// Create a reference
    pub fn new(collection: impl Into<String>, id: NativeId) -> Self {
        DbRef {
            collection: collection.into(),
            id,
        }
    }
}

impl fmt::Display for DbRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
