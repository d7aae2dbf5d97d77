//! Rendition types
//!
//! Profiles, per-generation configuration, and the generated rendition records.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

// ============================================================================
// Rendition Type
// ============================================================================

/// Kind of derived artifact
///
/// Serialized as its kebab-case name. Unknown names parse to `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RenditionType {
    Thumbnail,
    Pdf,
    Preview,
    TextExtract,
    WebOptimized,
    Compressed,
    Custom(String),
}

impl RenditionType {
    /// All kinds with a built-in handler
    pub const BUILTIN: [RenditionType; 6] = [
        Self::Thumbnail,
        Self::Pdf,
        Self::TextExtract,
        Self::Preview,
        Self::WebOptimized,
        Self::Compressed,
    ];

    /// Handler registry key
    pub fn as_str(&self) -> &str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Pdf => "pdf",
            Self::Preview => "preview",
            Self::TextExtract => "text-extract",
            Self::WebOptimized => "web-optimized",
            Self::Compressed => "compressed",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Maps a `Custom` spelling of a built-in name to that built-in variant
    pub fn canonical(self) -> Self {
        match self {
            Self::Custom(name) => Self::from(name),
            other => other,
        }
    }
}

impl FromStr for RenditionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "thumbnail" => Self::Thumbnail,
            "pdf" => Self::Pdf,
            "preview" => Self::Preview,
            "text-extract" => Self::TextExtract,
            "web-optimized" => Self::WebOptimized,
            "compressed" => Self::Compressed,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<&str> for RenditionType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<String> for RenditionType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<RenditionType> for String {
    fn from(kind: RenditionType) -> Self {
        match kind {
            RenditionType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RenditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Color,
    Grayscale,
    Monochrome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Lossy,
    Lossless,
}

/// Partial generation parameters supplied by callers and profiles
///
/// Unset fields are filled from engine defaults by [`RenditionConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<ColorMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_annotations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_watermark: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<bool>,
    /// Handler-specific settings passed through untouched
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, serde_json::Value>,
}

impl RenditionConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Merge over engine defaults; explicit values always win
    pub fn resolve(&self, engine: &EngineConfig) -> ResolvedConfig {
        ResolvedConfig {
            width: self.width,
            height: self.height,
            quality: self.quality.unwrap_or(engine.default_quality).min(100),
            dpi: self.dpi.unwrap_or(engine.default_dpi),
            color_mode: self.color_mode.unwrap_or_default(),
            compression: self.compression.unwrap_or_default(),
            include_annotations: self.include_annotations.unwrap_or(false),
            include_watermark: self.include_watermark.unwrap_or(false),
            accessibility: self.accessibility.unwrap_or(false),
            options: self.options.clone(),
        }
    }
}

/// Fully resolved parameters handed to a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    pub dpi: u32,
    pub color_mode: ColorMode,
    pub compression: Compression,
    pub include_annotations: bool,
    pub include_watermark: bool,
    pub accessibility: bool,
    pub options: HashMap<String, serde_json::Value>,
}

// ============================================================================
// Profiles
// ============================================================================

/// Administrator-defined policy for deriving a rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionProfile {
    /// Unique profile ID
    pub id: String,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind of rendition this profile produces
    #[serde(rename = "type")]
    pub rendition_type: RenditionType,
    pub enabled: bool,
    /// Fire from `auto_generate` when a document changes
    pub auto_generate: bool,
    /// Source MIME types this profile applies to (empty = all)
    #[serde(default)]
    pub supported_source_types: BTreeSet<String>,
    /// Configuration template
    #[serde(default)]
    pub config: RenditionConfig,
}

impl RenditionProfile {
    /// An enabled, auto-generating profile that applies to every source type
    pub fn new(id: impl Into<String>, rendition_type: impl Into<RenditionType>) -> Self {
        Self {
            id: id.into(),
            name: None,
            rendition_type: rendition_type.into(),
            enabled: true,
            auto_generate: true,
            supported_source_types: BTreeSet::new(),
            config: RenditionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenditionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_source_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_source_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn manual(mut self) -> Self {
        self.auto_generate = false;
        self
    }

    /// Whether this profile applies to a source of the given MIME type
    pub fn supports(&self, mime_type: &str) -> bool {
        self.supported_source_types.is_empty() || self.supported_source_types.contains(mime_type)
    }

    /// Stock profile set used by the demo binary: thumbnail, pdf, and text extraction
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("default-thumbnail", RenditionType::Thumbnail)
                .with_config(RenditionConfig::default().with_size(200, 200)),
            Self::new("default-pdf", RenditionType::Pdf),
            Self::new("default-text", RenditionType::TextExtract),
        ]
    }
}

// ============================================================================
// Renditions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenditionStatus {
    Completed,
    /// Superseded by a regeneration
    Stale,
}

/// What a handler returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutput {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub page_count: Option<u32>,
}

impl HandlerOutput {
    pub fn new(content: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }
}

/// One generated artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    pub id: String,
    pub document_id: String,
    /// Document version at generation time; never changes afterwards
    pub source_version: u64,
    #[serde(rename = "type")]
    pub rendition_type: RenditionType,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub size_bytes: usize,
    /// SHA-256 of `content`, hex encoded
    pub checksum: String,
    pub status: RenditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub quality: u8,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl Rendition {
    /// Whether the rendition predates the given document version
    pub fn is_outdated(&self, current_version: u64) -> bool {
        self.source_version < current_version
    }

    pub fn is_completed(&self) -> bool {
        self.status == RenditionStatus::Completed
    }
}

/// Engine counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Successful generations, all time
    pub total_generated: u64,
    /// Rendition records currently held
    pub total_stored: usize,
    /// Documents with at least one stored rendition list
    pub documents: usize,
    pub profiles: usize,
    pub handlers: usize,
}
