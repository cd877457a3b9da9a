//! Storage layer for docmap
//!
//! This crate implements an in-process `DocumentStore`:
//! - MemoryStore: DashMap of collections, BTreeMap of encoded documents per collection
//! - StoredDoc: MessagePack-encoded document wrapper
//! - StoreStats: per-operation call counters
//!
//! It backs the mapper's tests and any embedder that does not need
//! persistence.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod stats;
pub mod stored_doc;

pub use memory::MemoryStore;
pub use stats::{StatsSnapshot, StoreOp, StoreStats};
pub use stored_doc::StoredDoc;
