//! Core domain types: content sources, fetched documents, content hooks.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContentSource
// ---------------------------------------------------------------------------

/// How a document body is read off the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Decode the body as text (charset-aware) and store its UTF-8 bytes.
    #[default]
    Text,
    /// Keep the raw body bytes. Required for images and other non-text files.
    Binary,
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Per-source fetch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(default)]
    pub response_type: ResponseType,
}

/// A declared external location from which a batch of documents is fetched.
///
/// Deserialized from a `[[sources]]` table. Validation happens in
/// [`SourceRegistry`](crate::SourceRegistry), never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    /// Unique identifier across all registered sources.
    pub name: String,
    /// URL prefix prepended (with `/`) to every document.
    pub source_base_url: String,
    /// Output directory, relative to the site content root.
    pub out_dir: String,
    /// Relative filenames to fetch, in declaration order.
    pub documents: Vec<String>,
    #[serde(default)]
    pub fetch_options: FetchOptions,
    /// Name of a registered [`ContentHook`] to run after the fixed pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    /// Repository-relative links rewritten in this source's markdown.
    /// Links not listed here are left untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_rewrites: Vec<LinkRule>,
}

impl ContentSource {
    /// Fetch location for one of this source's documents.
    pub fn document_url(&self, document: &str) -> String {
        format!(
            "{}/{}",
            self.source_base_url.trim_end_matches('/'),
            document.trim_start_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Content kind, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Markdown,
    Binary,
}

impl ContentKind {
    /// Markdown iff the path carries a `.md` suffix.
    pub fn from_path(relative_path: &str) -> Self {
        if relative_path.ends_with(".md") {
            Self::Markdown
        } else {
            Self::Binary
        }
    }
}

/// One fetched file, on its way from the fetcher to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Name of the owning [`ContentSource`].
    pub source_name: String,
    /// Path relative to the source's `out_dir`.
    pub relative_path: String,
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
}

impl Document {
    pub fn new(
        source_name: impl Into<String>,
        relative_path: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let relative_path = relative_path.into();
        Self {
            source_name: source_name.into(),
            kind: ContentKind::from_path(&relative_path),
            relative_path,
            bytes,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.kind == ContentKind::Markdown
    }
}

// ---------------------------------------------------------------------------
// Content hooks
// ---------------------------------------------------------------------------

/// Result of a hook that chose to rewrite a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    /// Output filename, relative to the source's `out_dir`.
    pub filename: String,
    pub content: String,
}

/// Source-specific fixup that runs after the fixed compatibility pipeline.
///
/// Only markdown documents reach a hook. Returning `None` means
/// "no special handling" and leaves the pipeline output as is.
pub trait ContentHook: Send + Sync {
    fn rewrite(&self, filename: &str, content: &str) -> Option<HookOutput>;

    /// Name used to select this hook from configuration.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Link rules
// ---------------------------------------------------------------------------

/// `[[sources.link_rewrites]]` entry: one allow-listed repository-relative link.
///
/// Each kind derives its site-relative replacement from the repository
/// path; see `remotedocs_markdown::LinkRewriter` for the exact mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LinkRule {
    /// `docs/quickstart.md` → `./quickstart`
    DocSibling { path: String },
    /// `../demo/README.md` → `./demo/README`
    SubtreeIndex { path: String },
    /// `LICENSE` → `<repository>/blob/<branch>/LICENSE`
    License {
        repository: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default = "default_license_path")]
        path: String,
    },
    /// Literal mapping.
    Exact { from: String, to: String },
}

fn default_branch() -> String {
    "main".into()
}
fn default_license_path() -> String {
    "LICENSE".into()
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Check that `path` is a non-empty relative path that stays inside its parent.
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
