//! renditiond
//!
//! Loads files as documents, runs the default rendition profiles against them,
//! and prints a JSON summary of what was generated.
//!
//! Usage: `renditiond <path> [<path>...]`

use anyhow::{bail, Context};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rendition_engine::{Config, Document, Rendition, RenditionEngine, RenditionProfile};

/// Per-rendition summary; content itself is omitted
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenditionSummary {
    id: String,
    #[serde(rename = "type")]
    rendition_type: String,
    mime_type: String,
    size_bytes: usize,
    checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<u32>,
    processing_time_ms: u64,
}

impl From<&Rendition> for RenditionSummary {
    fn from(rendition: &Rendition) -> Self {
        Self {
            id: rendition.id.clone(),
            rendition_type: rendition.rendition_type.to_string(),
            mime_type: rendition.mime_type.clone(),
            size_bytes: rendition.size_bytes,
            checksum: rendition.checksum.clone(),
            page_count: rendition.page_count,
            processing_time_ms: rendition.processing_time_ms,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSummary {
    document_id: String,
    name: String,
    mime_type: String,
    renditions: Vec<RenditionSummary>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "rendition_engine=info,renditiond=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: renditiond <path> [<path>...]");
    }

    tracing::info!(
        "Starting renditiond v{} (handler timeout {}s)",
        env!("CARGO_PKG_VERSION"),
        config.engine.handler_timeout_secs
    );

    let engine = RenditionEngine::with_config(config.engine);
    for profile in RenditionProfile::defaults() {
        engine.register_profile(profile).await;
    }

    let mut summaries = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let document = Document::from_path(path, format!("doc-{}", index + 1))
            .await
            .with_context(|| format!("failed to read {}", path))?;

        let renditions = engine.auto_generate(&document).await;
        summaries.push(DocumentSummary {
            document_id: document.id.clone(),
            name: document.name.clone(),
            mime_type: document.mime_type.clone(),
            renditions: renditions.iter().map(RenditionSummary::from).collect(),
        });
    }

    let stats = engine.stats().await;
    tracing::info!(
        documents = stats.documents,
        total_generated = stats.total_generated,
        "Rendition run complete"
    );

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
