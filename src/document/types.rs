//! Core document types

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Document body as supplied by the CMS
///
/// Either raw text or an already-structured JSON value (e.g. block editor output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Text(String),
    Structured(serde_json::Value),
}

impl DocumentContent {
    /// Text form of the content: the text itself, or compact JSON for structured values
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            Self::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Length in bytes of the text form
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Structured(value) => value.to_string().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocumentContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for DocumentContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for DocumentContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for DocumentContent {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

/// A versioned source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document ID
    pub id: String,
    /// Monotonic version number, bumped by the CMS on every edit
    pub version: u64,
    /// Display name (usually the file name)
    pub name: String,
    /// Source MIME type
    pub mime_type: String,
    /// Document body
    pub content: DocumentContent,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<DocumentContent>,
    ) -> Self {
        Self {
            id: id.into(),
            version: 1,
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Load a document from disk at version 1
    ///
    /// The MIME type is guessed from the extension; bytes that are not valid
    /// UTF-8 are decoded lossily.
    pub async fn from_path(path: impl AsRef<Path>, id: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(id, name, mime_type, text))
    }
}
