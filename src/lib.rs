//! Rendition Engine Library
//!
//! Generates derived representations ("renditions") of CMS documents, tracks
//! them per document, and detects when they fall behind the source version.
//!
//! # Modules
//!
//! - `config`: Environment-driven engine configuration
//! - `document`: Source document abstraction consumed by the engine
//! - `rendition`: Profiles, handlers, and the `RenditionEngine` itself

pub mod config;
pub mod document;
pub mod rendition;

pub use config::{Config, ConfigError, EngineConfig};
pub use document::{Document, DocumentContent};
pub use rendition::{
    BlockingHandler, ColorMode, Compression, EngineStats, HandlerOutput, Rendition,
    RenditionConfig, RenditionEngine, RenditionError, RenditionHandler, RenditionProfile,
    RenditionStatus, RenditionType, ResolvedConfig,
};
