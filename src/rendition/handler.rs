//! Rendition handlers
//!
//! A handler turns a document plus a resolved configuration into rendered
//! content. The engine ships deterministic placeholder handlers so it is usable
//! without a rendering backend; embedding applications register real ones over
//! them.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{RenditionError, Result};
use super::types::{HandlerOutput, ResolvedConfig};
use crate::document::Document;

/// Pluggable content transformer for one rendition type
#[async_trait]
pub trait RenditionHandler: Send + Sync {
    /// Render the document with the given configuration
    async fn render(&self, document: &Document, config: &ResolvedConfig) -> Result<HandlerOutput>;
}

/// Adapts a synchronous function or closure into a handler
///
/// The function runs on the blocking thread pool, so a slow transform never
/// stalls the async runtime and the engine's handler timeout still applies.
pub struct BlockingHandler<F> {
    func: Arc<F>,
}

impl<F> BlockingHandler<F> {
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> RenditionHandler for BlockingHandler<F>
where
    F: Fn(&Document, &ResolvedConfig) -> Result<HandlerOutput> + Send + Sync + 'static,
{
    async fn render(&self, document: &Document, config: &ResolvedConfig) -> Result<HandlerOutput> {
        let func = Arc::clone(&self.func);
        let document = document.clone();
        let config = config.clone();

        tokio::task::spawn_blocking(move || func(&document, &config))
            .await
            .map_err(|e| RenditionError::TaskFailed(e.to_string()))?
    }
}

const THUMBNAIL_DEFAULT_SIZE: (u32, u32) = (200, 200);
const PREVIEW_DEFAULT_SIZE: (u32, u32) = (800, 600);
/// Characters per estimated PDF page
const PDF_CHARS_PER_PAGE: usize = 3000;
/// Estimated output size of the compressed placeholder, in percent of the source
const COMPRESSED_RATIO_PERCENT: usize = 60;

/// Placeholder image for small listing previews
pub struct ThumbnailHandler;

#[async_trait]
impl RenditionHandler for ThumbnailHandler {
    async fn render(&self, document: &Document, config: &ResolvedConfig) -> Result<HandlerOutput> {
        let (width, height) = dimensions(config, THUMBNAIL_DEFAULT_SIZE);
        let content = format!("[thumbnail] {} ({}x{})", document.name, width, height);
        Ok(HandlerOutput::new(content, "image/png").with_dimensions(width, height))
    }
}

/// Placeholder image for full-size previews
pub struct PreviewHandler;

#[async_trait]
impl RenditionHandler for PreviewHandler {
    async fn render(&self, document: &Document, config: &ResolvedConfig) -> Result<HandlerOutput> {
        let (width, height) = dimensions(config, PREVIEW_DEFAULT_SIZE);
        let content = format!("[preview] {} ({}x{})", document.name, width, height);
        Ok(HandlerOutput::new(content, "image/png").with_dimensions(width, height))
    }
}

/// Wraps the text content in a minimal PDF envelope
pub struct PdfHandler;

#[async_trait]
impl RenditionHandler for PdfHandler {
    async fn render(&self, document: &Document, _config: &ResolvedConfig) -> Result<HandlerOutput> {
        let text = document.content.as_text();
        let pages = text.chars().count().div_ceil(PDF_CHARS_PER_PAGE) as u32;
        let content = format!("%PDF-1.4\n% {}\n{}\n%%EOF\n", document.name, text);
        Ok(HandlerOutput::new(content, "application/pdf").with_page_count(pages))
    }
}

/// Plain text, or the JSON stringification of structured content
pub struct TextExtractHandler;

#[async_trait]
impl RenditionHandler for TextExtractHandler {
    async fn render(&self, document: &Document, _config: &ResolvedConfig) -> Result<HandlerOutput> {
        let text = document.content.as_text().into_owned();
        Ok(HandlerOutput::new(text, "text/plain"))
    }
}

/// Minimal HTML5 shell around the escaped content
pub struct WebOptimizedHandler;

#[async_trait]
impl RenditionHandler for WebOptimizedHandler {
    async fn render(&self, document: &Document, _config: &ResolvedConfig) -> Result<HandlerOutput> {
        let title = html_escape::encode_text(&document.name);
        let text = document.content.as_text();
        let body = html_escape::encode_text(&text);
        let content = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
            title, body
        );
        Ok(HandlerOutput::new(content, "text/html"))
    }
}

/// Reports an estimated 40% size reduction (in characters); keeps the source MIME type
pub struct CompressedHandler;

#[async_trait]
impl RenditionHandler for CompressedHandler {
    async fn render(&self, document: &Document, _config: &ResolvedConfig) -> Result<HandlerOutput> {
        let original = document.content.as_text().chars().count();
        let estimated = original * COMPRESSED_RATIO_PERCENT / 100;
        let content = format!(
            "[compressed] {}: {} -> {} chars",
            document.name, original, estimated
        );
        Ok(HandlerOutput::new(content, document.mime_type.clone()))
    }
}

/// Used for types with no registered handler
pub struct FallbackHandler;

#[async_trait]
impl RenditionHandler for FallbackHandler {
    async fn render(&self, document: &Document, _config: &ResolvedConfig) -> Result<HandlerOutput> {
        let content = format!("[rendition] {}", document.name);
        Ok(HandlerOutput::new(content, "application/octet-stream"))
    }
}

fn dimensions(config: &ResolvedConfig, default: (u32, u32)) -> (u32, u32) {
    (
        config.width.unwrap_or(default.0),
        config.height.unwrap_or(default.1),
    )
}
