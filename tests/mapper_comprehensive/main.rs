//! End-to-end mapper suite over the in-memory store
//!
//! Run with: `cargo test --test mapper_comprehensive`

#[path = "../common/mod.rs"]
mod common;

mod cascade_batching;
mod hooks_and_config;
mod id_properties;
mod nested_writes;
mod reference_encoding;
mod scalar_roundtrip;
