//! Validated collection of content sources, keyed by name.
//!
//! Built once at process start. All validation runs eagerly so a broken
//! configuration fails before any network request is made.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::error::{RemoteDocsError, Result};
use crate::types::{ContentHook, ContentKind, ContentSource, ResponseType, is_safe_relative_path};

// ---------------------------------------------------------------------------
// HookRegistry
// ---------------------------------------------------------------------------

/// Named content hooks that sources may select with `hook = "..."`.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn ContentHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under its own [`ContentHook::name`].
    pub fn register(&mut self, hook: Arc<dyn ContentHook>) {
        self.hooks.insert(hook.name().to_string(), hook);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ContentHook>> {
        self.hooks.get(name).cloned()
    }

    /// Registered hook names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SourceRegistry
// ---------------------------------------------------------------------------

/// A content source that passed validation, with its hook resolved.
#[derive(Clone)]
pub struct RegisteredSource {
    pub source: ContentSource,
    pub hook: Option<Arc<dyn ContentHook>>,
}

impl std::fmt::Debug for RegisteredSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredSource")
            .field("source", &self.source)
            .field("hook", &self.hook.as_ref().map(|h| h.name().to_string()))
            .finish()
    }
}

/// Validated sources in declaration order, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<RegisteredSource>,
    by_name: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Validate `sources` and resolve their hooks against `hooks`.
    pub fn from_sources(sources: Vec<ContentSource>, hooks: &HookRegistry) -> Result<Self> {
        let mut registry = Self::default();

        for source in sources {
            let source = validate_source(source)?;

            if registry.by_name.contains_key(&source.name) {
                return Err(RemoteDocsError::config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }

            let hook = match source.hook.as_deref() {
                Some(name) => Some(hooks.get(name).ok_or_else(|| {
                    RemoteDocsError::config(format!(
                        "source '{}': unknown hook '{name}' (available: {})",
                        source.name,
                        hooks.names().join(", ")
                    ))
                })?),
                None => None,
            };

            debug!(
                name = %source.name,
                documents = source.documents.len(),
                response_type = %source.fetch_options.response_type,
                "registered source"
            );

            registry
                .by_name
                .insert(source.name.clone(), registry.sources.len());
            registry.sources.push(RegisteredSource { source, hook });
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSource> {
        self.by_name.get(name).map(|&i| &self.sources[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Keep only the named sources. Every name must exist.
    pub fn retain_named(mut self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(missing) = names.iter().find(|n| !self.by_name.contains_key(n.as_str())) {
            return Err(RemoteDocsError::config(format!("no source named '{missing}'")));
        }

        self.sources.retain(|s| names.contains(&s.source.name));
        self.by_name = self
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.source.name.clone(), i))
            .collect();
        Ok(self)
    }
}

/// Check one descriptor; returns it with duplicate documents removed.
fn validate_source(mut source: ContentSource) -> Result<ContentSource> {
    if source.name.trim().is_empty() {
        return Err(RemoteDocsError::config("source with empty name"));
    }
    let name = source.name.clone();

    let base = Url::parse(&source.source_base_url).map_err(|e| {
        RemoteDocsError::config(format!(
            "source '{name}': invalid source_base_url '{}': {e}",
            source.source_base_url
        ))
    })?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(RemoteDocsError::config(format!(
            "source '{name}': source_base_url must be http or https, got '{}'",
            base.scheme()
        )));
    }

    if !is_safe_relative_path(&source.out_dir) {
        return Err(RemoteDocsError::config(format!(
            "source '{name}': out_dir '{}' must be a relative path inside the content root",
            source.out_dir
        )));
    }

    if source.documents.is_empty() {
        return Err(RemoteDocsError::config(format!(
            "source '{name}': documents must not be empty"
        )));
    }

    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(source.documents.len());
    for doc in source.documents.drain(..) {
        if !is_safe_relative_path(&doc) {
            return Err(RemoteDocsError::config(format!(
                "source '{name}': document '{doc}' must be a relative path"
            )));
        }
        if !seen.insert(doc.clone()) {
            warn!(source = %name, document = %doc, "duplicate document entry, fetching once");
            continue;
        }
        documents.push(doc);
    }
    source.documents = documents;

    for doc in &source.documents {
        Url::parse(&source.document_url(doc)).map_err(|e| {
            RemoteDocsError::config(format!(
                "source '{name}': document '{doc}' does not form a valid URL: {e}"
            ))
        })?;

        if source.fetch_options.response_type == ResponseType::Text
            && ContentKind::from_path(doc) == ContentKind::Binary
            && looks_binary(doc)
        {
            warn!(
                source = %name,
                document = %doc,
                "non-text document fetched with response_type = \"text\"; bytes may be corrupted"
            );
        }
    }

    Ok(source)
}

/// File extensions that text decoding would corrupt.
fn looks_binary(path: &str) -> bool {
    const BINARY_EXTENSIONS: &[&str] = &[
        "png", "jpg", "jpeg", "gif", "webp", "ico", "bmp", "pdf", "zip", "gz", "woff", "woff2",
    ];
    path.rsplit_once('.')
        .map(|(_, ext)| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
