//! Rendition Engine
//!
//! Owns rendition profiles, the handler registry, and the per-document list of
//! generated renditions:
//! - Profile-gated and ad-hoc generation through pluggable handlers
//! - Staleness detection against the document version
//! - Batch auto-generation and regeneration that skip failing items

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

use super::error::{RenditionError, Result};
use super::handler::{
    BlockingHandler, CompressedHandler, FallbackHandler, PdfHandler, PreviewHandler,
    RenditionHandler, TextExtractHandler, ThumbnailHandler, WebOptimizedHandler,
};
use super::types::{
    EngineStats, HandlerOutput, Rendition, RenditionConfig, RenditionProfile, RenditionStatus,
    RenditionType, ResolvedConfig,
};
use crate::config::EngineConfig;
use crate::document::Document;

// ============================================================================
// Engine
// ============================================================================

/// In-memory rendition engine
///
/// Cloning yields another handle to the same engine. Every value handed back
/// to callers is an owned copy.
#[derive(Clone)]
pub struct RenditionEngine {
    inner: Arc<RenditionEngineInner>,
}

struct RenditionEngineInner {
    /// Profiles indexed by ID, with their registration sequence
    profiles: RwLock<HashMap<String, ProfileEntry>>,

    /// Handlers indexed by rendition type name
    handlers: RwLock<HashMap<String, Arc<dyn RenditionHandler>>>,

    /// Renditions per document, in generation order
    renditions: RwLock<HashMap<String, Vec<Rendition>>>,

    /// Handler for types nothing is registered for
    fallback: Arc<dyn RenditionHandler>,

    /// Next profile registration sequence
    profile_seq: AtomicU64,

    /// Successful generations, all time
    total_generated: AtomicU64,

    config: EngineConfig,
}

struct ProfileEntry {
    seq: u64,
    profile: RenditionProfile,
}

impl RenditionEngine {
    /// Create an engine with default configuration and the built-in handlers
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom configuration and the built-in handlers
    pub fn with_config(config: EngineConfig) -> Self {
        let mut handlers: HashMap<String, Arc<dyn RenditionHandler>> = HashMap::new();
        handlers.insert(RenditionType::Thumbnail.to_string(), Arc::new(ThumbnailHandler));
        handlers.insert(RenditionType::Pdf.to_string(), Arc::new(PdfHandler));
        handlers.insert(RenditionType::TextExtract.to_string(), Arc::new(TextExtractHandler));
        handlers.insert(RenditionType::Preview.to_string(), Arc::new(PreviewHandler));
        handlers.insert(RenditionType::WebOptimized.to_string(), Arc::new(WebOptimizedHandler));
        handlers.insert(RenditionType::Compressed.to_string(), Arc::new(CompressedHandler));

        Self {
            inner: Arc::new(RenditionEngineInner {
                profiles: RwLock::new(HashMap::new()),
                handlers: RwLock::new(handlers),
                renditions: RwLock::new(HashMap::new()),
                fallback: Arc::new(FallbackHandler),
                profile_seq: AtomicU64::new(0),
                total_generated: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Store a profile, replacing any profile with the same ID
    ///
    /// A replaced profile keeps its original position in iteration order.
    pub async fn register_profile(&self, profile: RenditionProfile) {
        let mut profiles = self.inner.profiles.write().await;

        tracing::info!(
            profile_id = %profile.id,
            rendition_type = %profile.rendition_type,
            enabled = profile.enabled,
            auto_generate = profile.auto_generate,
            "Registered rendition profile"
        );

        match profiles.get_mut(&profile.id) {
            Some(entry) => entry.profile = profile,
            None => {
                let seq = self.inner.profile_seq.fetch_add(1, Ordering::Relaxed);
                profiles.insert(profile.id.clone(), ProfileEntry { seq, profile });
            }
        }
    }

    pub async fn get_profile(&self, id: &str) -> Option<RenditionProfile> {
        let profiles = self.inner.profiles.read().await;
        profiles.get(id).map(|entry| entry.profile.clone())
    }

    /// All profiles in registration order
    pub async fn list_profiles(&self) -> Vec<RenditionProfile> {
        let profiles = self.inner.profiles.read().await;
        let mut entries: Vec<&ProfileEntry> = profiles.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.profile.clone()).collect()
    }

    pub async fn remove_profile(&self, id: &str) -> bool {
        let removed = self.inner.profiles.write().await.remove(id).is_some();
        if removed {
            tracing::info!(profile_id = %id, "Removed rendition profile");
        }
        removed
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Install the handler for a rendition type, replacing any existing one
    pub async fn register_handler<H>(&self, rendition_type: impl Into<RenditionType>, handler: H)
    where
        H: RenditionHandler + 'static,
    {
        let rendition_type = rendition_type.into();
        let mut handlers = self.inner.handlers.write().await;
        handlers.insert(rendition_type.to_string(), Arc::new(handler));

        tracing::info!(rendition_type = %rendition_type, "Registered rendition handler");
    }

    /// Install a synchronous function as the handler for a rendition type
    ///
    /// The function runs on the blocking pool so the handler timeout applies.
    pub async fn register_fn_handler<F>(&self, rendition_type: impl Into<RenditionType>, func: F)
    where
        F: Fn(&Document, &ResolvedConfig) -> Result<HandlerOutput> + Send + Sync + 'static,
    {
        self.register_handler(rendition_type, BlockingHandler::new(func)).await;
    }

    pub async fn has_handler(&self, rendition_type: &RenditionType) -> bool {
        let handlers = self.inner.handlers.read().await;
        handlers.contains_key(rendition_type.as_str())
    }

    /// Registered handler type names, sorted
    pub async fn handler_types(&self) -> Vec<String> {
        let handlers = self.inner.handlers.read().await;
        let mut types: Vec<String> = handlers.keys().cloned().collect();
        types.sort();
        types
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// Generate a rendition of `document` and store it
    ///
    /// `overrides` are merged over the engine defaults. Types without a
    /// registered handler fall back to an opaque `application/octet-stream`
    /// placeholder. Handler errors and timeouts are returned to the caller.
    pub async fn generate(
        &self,
        document: &Document,
        rendition_type: impl Into<RenditionType>,
        overrides: Option<&RenditionConfig>,
    ) -> Result<Rendition> {
        let rendition_type = rendition_type.into().canonical();
        let config = overrides
            .cloned()
            .unwrap_or_default()
            .resolve(&self.inner.config);

        let handler = {
            let handlers = self.inner.handlers.read().await;
            handlers.get(rendition_type.as_str()).cloned()
        };
        let handler = handler.unwrap_or_else(|| {
            tracing::warn!(
                document_id = %document.id,
                rendition_type = %rendition_type,
                "No handler registered, using fallback"
            );
            self.inner.fallback.clone()
        });

        // Lock-free while the handler runs
        let timeout_secs = self.inner.config.handler_timeout_secs;
        let started = Instant::now();
        let output = timeout(
            self.inner.config.handler_timeout(),
            handler.render(document, &config),
        )
        .await
        .map_err(|_| RenditionError::Timeout(timeout_secs))??;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        let rendition = Rendition {
            id: Uuid::new_v4().to_string(),
            document_id: document.id.clone(),
            source_version: document.version,
            rendition_type,
            size_bytes: output.content.len(),
            checksum: hex::encode(Sha256::digest(&output.content)),
            mime_type: output.mime_type,
            content: output.content,
            status: RenditionStatus::Completed,
            width: output.width,
            height: output.height,
            page_count: output.page_count,
            quality: config.quality,
            processing_time_ms,
            created_at: Utc::now(),
        };

        {
            let mut renditions = self.inner.renditions.write().await;
            renditions
                .entry(document.id.clone())
                .or_default()
                .push(rendition.clone());
        }
        self.inner.total_generated.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            document_id = %rendition.document_id,
            rendition_id = %rendition.id,
            rendition_type = %rendition.rendition_type,
            source_version = rendition.source_version,
            size_bytes = rendition.size_bytes,
            processing_time_ms = rendition.processing_time_ms,
            "Generated rendition"
        );

        Ok(rendition)
    }

    /// Generate using a registered profile's type and configuration
    pub async fn generate_from_profile(
        &self,
        document: &Document,
        profile_id: &str,
    ) -> Result<Rendition> {
        let profile = self
            .get_profile(profile_id)
            .await
            .ok_or_else(|| RenditionError::ProfileNotFound(profile_id.to_string()))?;

        if !profile.enabled {
            return Err(RenditionError::ProfileDisabled(profile_id.to_string()));
        }

        if !profile.supports(&document.mime_type) {
            return Err(RenditionError::UnsupportedSourceType {
                profile_id: profile_id.to_string(),
                mime_type: document.mime_type.clone(),
            });
        }

        self.generate(document, profile.rendition_type, Some(&profile.config))
            .await
    }

    /// Run every enabled auto-generate profile that applies to the document
    ///
    /// Failing profiles are logged and skipped; the successes are returned in
    /// profile registration order.
    pub async fn auto_generate(&self, document: &Document) -> Vec<Rendition> {
        let profiles: Vec<RenditionProfile> = self
            .list_profiles()
            .await
            .into_iter()
            .filter(|p| p.enabled && p.auto_generate && p.supports(&document.mime_type))
            .collect();

        let mut generated = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            match self
                .generate(document, profile.rendition_type.clone(), Some(&profile.config))
                .await
            {
                Ok(rendition) => generated.push(rendition),
                Err(e) => {
                    tracing::warn!(
                        document_id = %document.id,
                        profile_id = %profile.id,
                        error = %e,
                        "Auto-generation failed, skipping profile"
                    );
                }
            }
        }

        tracing::info!(
            document_id = %document.id,
            profiles = profiles.len(),
            generated = generated.len(),
            "Auto-generated renditions"
        );

        generated
    }

    /// Regenerate every stale rendition of the document
    ///
    /// Each replacement reuses the old type, dimensions, and quality; other
    /// settings fall back to defaults. A superseded rendition is marked
    /// `Stale` only once its replacement exists. Failures are logged and
    /// skipped. Only the new renditions are returned.
    pub async fn regenerate_stale(&self, document: &Document) -> Vec<Rendition> {
        let stale = self
            .get_stale_renditions(&document.id, document.version)
            .await;

        let mut regenerated = Vec::with_capacity(stale.len());
        for old in &stale {
            let config = RenditionConfig {
                width: old.width,
                height: old.height,
                quality: Some(old.quality),
                ..Default::default()
            };

            match self
                .generate(document, old.rendition_type.clone(), Some(&config))
                .await
            {
                Ok(rendition) => {
                    self.mark_stale(&document.id, &old.id).await;
                    regenerated.push(rendition);
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = %document.id,
                        rendition_id = %old.id,
                        rendition_type = %old.rendition_type,
                        error = %e,
                        "Regeneration failed, skipping rendition"
                    );
                }
            }
        }

        if !stale.is_empty() {
            tracing::info!(
                document_id = %document.id,
                version = document.version,
                stale = stale.len(),
                regenerated = regenerated.len(),
                "Regenerated stale renditions"
            );
        }

        regenerated
    }

    /// The only post-creation status transition: `Completed` -> `Stale`
    async fn mark_stale(&self, document_id: &str, rendition_id: &str) -> bool {
        let mut renditions = self.inner.renditions.write().await;
        match renditions
            .get_mut(document_id)
            .and_then(|list| list.iter_mut().find(|r| r.id == rendition_id))
        {
            Some(rendition) => {
                rendition.status = RenditionStatus::Stale;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    /// All renditions of a document, in generation order
    pub async fn get_renditions(&self, document_id: &str) -> Vec<Rendition> {
        let renditions = self.inner.renditions.read().await;
        renditions.get(document_id).cloned().unwrap_or_default()
    }

    /// The earliest completed rendition of the given type
    pub async fn get_rendition_by_type(
        &self,
        document_id: &str,
        rendition_type: &RenditionType,
    ) -> Option<Rendition> {
        let renditions = self.inner.renditions.read().await;
        renditions.get(document_id).and_then(|list| {
            list.iter()
                .find(|r| r.rendition_type.as_str() == rendition_type.as_str() && r.is_completed())
                .cloned()
        })
    }

    pub async fn get_rendition(&self, document_id: &str, rendition_id: &str) -> Option<Rendition> {
        let renditions = self.inner.renditions.read().await;
        renditions
            .get(document_id)
            .and_then(|list| list.iter().find(|r| r.id == rendition_id).cloned())
    }

    /// True if the rendition is missing or older than `current_version`
    pub async fn is_stale(
        &self,
        document_id: &str,
        rendition_id: &str,
        current_version: u64,
    ) -> bool {
        let renditions = self.inner.renditions.read().await;
        renditions
            .get(document_id)
            .and_then(|list| list.iter().find(|r| r.id == rendition_id))
            .map_or(true, |r| r.is_outdated(current_version))
    }

    /// Completed renditions older than `current_version`
    ///
    /// Renditions already marked `Stale` are not reported again.
    pub async fn get_stale_renditions(
        &self,
        document_id: &str,
        current_version: u64,
    ) -> Vec<Rendition> {
        let renditions = self.inner.renditions.read().await;
        renditions
            .get(document_id)
            .map(|list| {
                list.iter()
                    .filter(|r| r.is_completed() && r.is_outdated(current_version))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn delete_rendition(&self, document_id: &str, rendition_id: &str) -> bool {
        let mut renditions = self.inner.renditions.write().await;
        let Some(list) = renditions.get_mut(document_id) else {
            return false;
        };

        let before = list.len();
        list.retain(|r| r.id != rendition_id);
        let removed = list.len() < before;

        if list.is_empty() {
            renditions.remove(document_id);
        }
        removed
    }

    /// Drop every rendition of a document, returning how many were removed
    pub async fn delete_all_renditions(&self, document_id: &str) -> usize {
        let removed = {
            let mut renditions = self.inner.renditions.write().await;
            renditions.remove(document_id).map_or(0, |list| list.len())
        };

        if removed > 0 {
            tracing::info!(document_id = %document_id, count = removed, "Deleted renditions");
        }
        removed
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    pub fn total_generated(&self) -> u64 {
        self.inner.total_generated.load(Ordering::Relaxed)
    }

    /// Rendition records currently held across all documents
    pub async fn total_stored(&self) -> usize {
        let renditions = self.inner.renditions.read().await;
        renditions.values().map(Vec::len).sum()
    }

    pub async fn stats(&self) -> EngineStats {
        let (total_stored, documents) = {
            let renditions = self.inner.renditions.read().await;
            (renditions.values().map(Vec::len).sum(), renditions.len())
        };

        EngineStats {
            total_generated: self.total_generated(),
            total_stored,
            documents,
            profiles: self.inner.profiles.read().await.len(),
            handlers: self.inner.handlers.read().await.len(),
        }
    }
}

impl Default for RenditionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::rendition::types::{ColorMode, Compression, HandlerOutput, ResolvedConfig};

    fn create_test_document() -> Document {
        Document::new("doc-1", "quarterly.txt", "text/plain", "Revenue grew 12%").with_version(1)
    }

    fn failing_handler(_: &Document, _: &ResolvedConfig) -> Result<HandlerOutput> {
        Err(RenditionError::handler("broken", "renderer crashed"))
    }

    /// Echoes the resolved config back as JSON
    fn config_echo_handler(_: &Document, config: &ResolvedConfig) -> Result<HandlerOutput> {
        let json = serde_json::to_vec(config)
            .map_err(|e| RenditionError::handler("echo", e.to_string()))?;
        Ok(HandlerOutput::new(json, "application/json"))
    }

    struct SlowHandler;

    #[async_trait]
    impl RenditionHandler for SlowHandler {
        async fn render(&self, _: &Document, _: &ResolvedConfig) -> Result<HandlerOutput> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(HandlerOutput::new("late", "text/plain"))
        }
    }

    #[tokio::test]
    async fn test_builtin_handlers_registered() {
        let engine = RenditionEngine::new();
        for kind in RenditionType::BUILTIN {
            assert!(engine.has_handler(&kind).await, "missing handler for {kind}");
        }
        assert_eq!(engine.handler_types().await.len(), 6);
    }

    #[tokio::test]
    async fn test_generate_applies_default_config() {
        let engine = RenditionEngine::new();
        engine.register_fn_handler("echo", config_echo_handler).await;
        let doc = create_test_document();

        let rendition = engine
            .generate(&doc, "echo", Some(&RenditionConfig::default()))
            .await
            .unwrap();
        let config: ResolvedConfig = serde_json::from_slice(&rendition.content).unwrap();
        assert_eq!(config.quality, 85);
        assert_eq!(config.dpi, 150);
        assert_eq!(config.color_mode, ColorMode::Color);
        assert_eq!(config.compression, Compression::Lossy);
        assert_eq!(rendition.quality, 85);

        let overrides = RenditionConfig::default().with_quality(40);
        let rendition = engine.generate(&doc, "echo", Some(&overrides)).await.unwrap();
        let config: ResolvedConfig = serde_json::from_slice(&rendition.content).unwrap();
        assert_eq!(config.quality, 40);
        assert_eq!(config.dpi, 150);
        assert_eq!(config.color_mode, ColorMode::Color);
        assert_eq!(config.compression, Compression::Lossy);
    }

    #[tokio::test]
    async fn test_generate_records_rendition() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();

        let rendition = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();

        assert_eq!(rendition.document_id, "doc-1");
        assert_eq!(rendition.status, RenditionStatus::Completed);
        assert_eq!(rendition.mime_type, "application/pdf");
        assert_eq!(rendition.page_count, Some(1));
        assert_eq!(rendition.size_bytes, rendition.content.len());
        assert_eq!(rendition.checksum.len(), 64);
        assert_eq!(engine.total_generated(), 1);
        assert_eq!(engine.total_stored().await, 1);
        assert_eq!(engine.get_renditions("doc-1").await, vec![rendition]);
    }

    #[tokio::test]
    async fn test_source_version_frozen() {
        let engine = RenditionEngine::new();
        let mut doc = create_test_document().with_version(3);

        let rendition = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();
        doc.version = 4;

        assert_eq!(rendition.source_version, 3);
        let stored = engine.get_rendition("doc-1", &rendition.id).await.unwrap();
        assert_eq!(stored.source_version, 3);
    }

    #[tokio::test]
    async fn test_returned_renditions_are_copies() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();

        let mut rendition = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();
        rendition.status = RenditionStatus::Stale;
        rendition.content.clear();

        let stored = engine.get_rendition("doc-1", &rendition.id).await.unwrap();
        assert_eq!(stored.status, RenditionStatus::Completed);
        assert!(!stored.content.is_empty());
    }

    #[tokio::test]
    async fn test_is_stale() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();
        let rendition = engine.generate(&doc, RenditionType::Thumbnail, None).await.unwrap();

        assert!(!engine.is_stale("doc-1", &rendition.id, 1).await);
        assert!(engine.is_stale("doc-1", &rendition.id, 2).await);
        assert!(!engine.is_stale("doc-1", &rendition.id, 0).await);
        assert!(engine.is_stale("doc-1", "missing", 1).await);
        assert!(engine.is_stale("unknown-doc", &rendition.id, 1).await);
    }

    #[tokio::test]
    async fn test_unknown_type_falls_back() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();

        let rendition = engine.generate(&doc, "nonexistent-type", None).await.unwrap();

        assert_eq!(rendition.mime_type, "application/octet-stream");
        assert_eq!(
            rendition.rendition_type,
            RenditionType::Custom("nonexistent-type".to_string())
        );
        assert_eq!(rendition.width, None);
        assert_eq!(rendition.height, None);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let engine = RenditionEngine::new();
        engine.register_fn_handler(RenditionType::Pdf, failing_handler).await;
        let doc = create_test_document();

        let result = engine.generate(&doc, RenditionType::Pdf, None).await;

        assert!(matches!(result, Err(RenditionError::Handler { .. })));
        assert_eq!(engine.total_generated(), 0);
        assert_eq!(engine.total_stored().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_timeout() {
        let engine = RenditionEngine::with_config(EngineConfig {
            handler_timeout_secs: 1,
            ..Default::default()
        });
        engine.register_handler("slow", SlowHandler).await;
        let doc = create_test_document();

        let result = engine.generate(&doc, "slow", None).await;

        assert!(matches!(result, Err(RenditionError::Timeout(1))));
        assert!(engine.get_renditions("doc-1").await.is_empty());
    }

    fn blocking_slow_handler(_: &Document, _: &ResolvedConfig) -> Result<HandlerOutput> {
        std::thread::sleep(Duration::from_secs(2));
        Ok(HandlerOutput::new("late", "text/plain"))
    }

    #[tokio::test]
    async fn test_fn_handler_timeout() {
        let engine = RenditionEngine::with_config(EngineConfig {
            handler_timeout_secs: 1,
            ..Default::default()
        });
        engine.register_fn_handler("slow", blocking_slow_handler).await;
        let doc = create_test_document();

        let result = engine.generate(&doc, "slow", None).await;

        assert!(matches!(result, Err(RenditionError::Timeout(1))));
        assert!(engine.get_renditions("doc-1").await.is_empty());
        assert_eq!(engine.total_generated(), 0);
    }

    #[tokio::test]
    async fn test_custom_spelling_of_builtin_type() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();

        let rendition = engine
            .generate(&doc, RenditionType::Custom("pdf".to_string()), None)
            .await
            .unwrap();

        assert_eq!(rendition.rendition_type, RenditionType::Pdf);
        assert_eq!(rendition.mime_type, "application/pdf");
        let found = engine
            .get_rendition_by_type("doc-1", &RenditionType::Pdf)
            .await
            .unwrap();
        assert_eq!(found.id, rendition.id);
        let found = engine
            .get_rendition_by_type("doc-1", &RenditionType::Custom("pdf".to_string()))
            .await
            .unwrap();
        assert_eq!(found.id, rendition.id);
    }

    #[tokio::test]
    async fn test_profile_registry() {
        let engine = RenditionEngine::new();
        engine.register_profile(RenditionProfile::new("b", RenditionType::Pdf)).await;
        engine.register_profile(RenditionProfile::new("a", RenditionType::Thumbnail)).await;
        engine
            .register_profile(RenditionProfile::new("b", RenditionType::Preview).disabled())
            .await;

        let ids: Vec<String> = engine.list_profiles().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let b = engine.get_profile("b").await.unwrap();
        assert_eq!(b.rendition_type, RenditionType::Preview);
        assert!(!b.enabled);

        assert!(engine.remove_profile("a").await);
        assert!(!engine.remove_profile("a").await);
        assert!(engine.get_profile("a").await.is_none());
    }

    #[tokio::test]
    async fn test_generate_from_profile_gating() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();
        engine
            .register_profile(RenditionProfile::new("off", RenditionType::Pdf).disabled())
            .await;
        engine
            .register_profile(
                RenditionProfile::new("html-only", RenditionType::Pdf)
                    .with_source_types(["text/html"]),
            )
            .await;
        engine
            .register_profile(
                RenditionProfile::new("thumb", RenditionType::Thumbnail)
                    .with_source_types(["text/plain"])
                    .with_config(RenditionConfig::default().with_size(32, 24).with_quality(50)),
            )
            .await;

        assert!(matches!(
            engine.generate_from_profile(&doc, "missing").await,
            Err(RenditionError::ProfileNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            engine.generate_from_profile(&doc, "off").await,
            Err(RenditionError::ProfileDisabled(_))
        ));
        let err = engine.generate_from_profile(&doc, "html-only").await.unwrap_err();
        assert!(matches!(err, RenditionError::UnsupportedSourceType { .. }));
        assert!(err.is_configuration());

        let rendition = engine.generate_from_profile(&doc, "thumb").await.unwrap();
        assert_eq!(rendition.rendition_type, RenditionType::Thumbnail);
        assert_eq!((rendition.width, rendition.height), (Some(32), Some(24)));
        assert_eq!(rendition.quality, 50);
        assert_eq!(engine.total_stored().await, 1);
    }

    #[tokio::test]
    async fn test_auto_generate_isolates_failures() {
        let engine = RenditionEngine::new();
        engine.register_fn_handler("broken", failing_handler).await;
        engine.register_profile(RenditionProfile::new("bad", "broken")).await;
        engine.register_profile(RenditionProfile::new("good", RenditionType::TextExtract)).await;
        let doc = create_test_document();

        let generated = engine.auto_generate(&doc).await;

        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].rendition_type, RenditionType::TextExtract);
        assert_eq!(generated[0].content, b"Revenue grew 12%");
    }

    #[tokio::test]
    async fn test_auto_generate_filters_profiles() {
        let engine = RenditionEngine::new();
        engine.register_profile(RenditionProfile::new("pdf", RenditionType::Pdf)).await;
        engine
            .register_profile(RenditionProfile::new("manual", RenditionType::Preview).manual())
            .await;
        engine
            .register_profile(RenditionProfile::new("off", RenditionType::Preview).disabled())
            .await;
        engine
            .register_profile(
                RenditionProfile::new("images", RenditionType::Thumbnail)
                    .with_source_types(["image/png"]),
            )
            .await;
        engine.register_profile(RenditionProfile::new("html", RenditionType::WebOptimized)).await;
        let doc = create_test_document();

        let generated = engine.auto_generate(&doc).await;

        let types: Vec<RenditionType> = generated.into_iter().map(|r| r.rendition_type).collect();
        assert_eq!(types, vec![RenditionType::Pdf, RenditionType::WebOptimized]);
    }

    #[tokio::test]
    async fn test_regenerate_stale() {
        let engine = RenditionEngine::new();
        let mut doc = create_test_document();
        let original = engine
            .generate(
                &doc,
                RenditionType::Thumbnail,
                Some(&RenditionConfig::default().with_size(64, 64).with_quality(70)),
            )
            .await
            .unwrap();

        doc.version = 2;
        let regenerated = engine.regenerate_stale(&doc).await;

        assert_eq!(regenerated.len(), 1);
        let fresh = &regenerated[0];
        assert_eq!(fresh.source_version, 2);
        assert_eq!(fresh.status, RenditionStatus::Completed);
        assert_eq!((fresh.width, fresh.height), (Some(64), Some(64)));
        assert_eq!(fresh.quality, 70);

        let all = engine.get_renditions("doc-1").await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, original.id);
        assert_eq!(all[0].status, RenditionStatus::Stale);
        assert_eq!(all[0].source_version, 1);
        assert_eq!(all[1].id, fresh.id);
        assert_eq!(all[1].status, RenditionStatus::Completed);

        // Already-flagged renditions are not reported again
        assert!(engine.get_stale_renditions("doc-1", 2).await.is_empty());
        assert!(engine.regenerate_stale(&doc).await.is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_stale_skips_failures() {
        let engine = RenditionEngine::new();
        let mut doc = create_test_document();
        let pdf = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();
        engine.generate(&doc, RenditionType::TextExtract, None).await.unwrap();

        engine.register_fn_handler(RenditionType::Pdf, failing_handler).await;
        doc.version = 2;
        let regenerated = engine.regenerate_stale(&doc).await;

        assert_eq!(regenerated.len(), 1);
        assert_eq!(regenerated[0].rendition_type, RenditionType::TextExtract);
        // Failed item keeps its status so a later pass can retry it
        let pdf = engine.get_rendition("doc-1", &pdf.id).await.unwrap();
        assert_eq!(pdf.status, RenditionStatus::Completed);
        assert_eq!(engine.get_stale_renditions("doc-1", 2).await.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_stale() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();
        let rendition = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();

        assert!(engine.mark_stale("doc-1", &rendition.id).await);
        assert!(!engine.mark_stale("doc-1", "missing").await);
        assert!(!engine.mark_stale("other", &rendition.id).await);

        let stored = engine.get_rendition("doc-1", &rendition.id).await.unwrap();
        assert_eq!(stored.status, RenditionStatus::Stale);
        assert!(engine.get_rendition_by_type("doc-1", &RenditionType::Pdf).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_accounting() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();
        let first = engine.generate(&doc, RenditionType::Pdf, None).await.unwrap();
        engine.generate(&doc, RenditionType::Preview, None).await.unwrap();
        assert_eq!(engine.total_stored().await, 2);

        assert!(!engine.delete_rendition("doc-1", "missing").await);
        assert_eq!(engine.total_stored().await, 2);

        assert!(engine.delete_rendition("doc-1", &first.id).await);
        assert_eq!(engine.total_stored().await, 1);
        assert_eq!(engine.total_generated(), 2);

        assert_eq!(engine.delete_all_renditions("doc-1").await, 1);
        assert_eq!(engine.delete_all_renditions("doc-1").await, 0);
        assert_eq!(engine.total_stored().await, 0);
    }

    #[tokio::test]
    async fn test_get_rendition_by_type_first_match() {
        let engine = RenditionEngine::new();
        let doc = create_test_document();
        let first = engine.generate(&doc, RenditionType::Thumbnail, None).await.unwrap();
        let second = engine.generate(&doc, RenditionType::Thumbnail, None).await.unwrap();
        assert_ne!(first.id, second.id);

        let found = engine
            .get_rendition_by_type("doc-1", &RenditionType::Thumbnail)
            .await
            .unwrap();
        assert_eq!(found.id, first.id);
        assert!(engine.get_rendition_by_type("doc-1", &RenditionType::Pdf).await.is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let engine = RenditionEngine::new();
        engine.register_profile(RenditionProfile::new("pdf", RenditionType::Pdf)).await;
        let doc = create_test_document();
        let other = Document::new("doc-2", "b.txt", "text/plain", "b");

        engine.auto_generate(&doc).await;
        engine.auto_generate(&other).await;
        engine.delete_all_renditions("doc-2").await;

        let stats = engine.stats().await;
        assert_eq!(stats.total_generated, 2);
        assert_eq!(stats.total_stored, 1);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.profiles, 1);
        assert_eq!(stats.handlers, 6);
    }
}
