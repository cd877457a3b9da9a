//! Storage-layer document wrapper
//!
//! Documents are kept MessagePack-encoded so nothing a caller holds can
//! alias stored state, and so every read hands back a fresh copy.

use docmap_core::{Document, Result};

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    /// Encoded document bytes
    bytes: Vec<u8>,
    /// Write sequence at which this version was stored
    seq: u64,
}

impl StoredDoc {
    /// Encode a document for storage
    pub fn encode(doc: &Document, seq: u64) -> Result<Self> {
        let bytes = rmp_serde::to_vec(doc)?;
        Ok(StoredDoc { bytes, seq })
    }

    /// Decode back into a document
    pub fn decode(&self) -> Result<Document> {
        Ok(rmp_serde::from_slice(&self.bytes)?)
    }

    /// Write sequence of this version
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Encoded size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
