//! Source document abstraction
//!
//! Documents are owned by the embedding application and only borrowed by the
//! rendition engine, which never mutates them. The `version` field is the
//! anchor for staleness checks.

mod types;

pub use types::{Document, DocumentContent};
