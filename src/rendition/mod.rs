//! Document renditions
//!
//! Derived representations of source documents (thumbnails, PDFs, previews,
//! extracted text, ...) generated through pluggable handlers and tracked per
//! document against the source version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   RenditionEngine                       │
//! │  profiles │ handler registry │ renditions per document  │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!           ┌────────────────┼────────────────┐
//!           ▼                ▼                ▼
//!   ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//!   │  Built-in    │ │  Application │ │   Fallback   │
//!   │  handlers    │ │  handlers    │ │  (octet)     │
//!   └──────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rendition_engine::{Document, RenditionEngine, RenditionProfile, RenditionType};
//!
//! let engine = RenditionEngine::new();
//! engine.register_profile(RenditionProfile::new("thumb", RenditionType::Thumbnail)).await;
//!
//! let mut doc = Document::new("doc-1", "notes.md", "text/markdown", "# Notes");
//! let created = engine.auto_generate(&doc).await;
//!
//! // Later, after an edit
//! doc.version += 1;
//! let fresh = engine.regenerate_stale(&doc).await;
//! ```

mod engine;
mod error;
mod handler;
mod types;

pub use engine::RenditionEngine;
pub use error::{RenditionError, Result};
pub use handler::{
    BlockingHandler, CompressedHandler, FallbackHandler, PdfHandler, PreviewHandler,
    RenditionHandler, TextExtractHandler, ThumbnailHandler, WebOptimizedHandler,
};
pub use types::{
    ColorMode, Compression, EngineStats, HandlerOutput, Rendition, RenditionConfig,
    RenditionProfile, RenditionStatus, RenditionType, ResolvedConfig,
};
