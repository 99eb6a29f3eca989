//! Repository layer: free functions over a borrowed `Connection`.
//!
//! Callers that need serialized access go through `RecordStore`.

mod document;

pub use document::*;
