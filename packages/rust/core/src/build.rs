//! End-to-end site build: registry → fetch → transform → write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use remotedocs_fetch::Fetcher;
use remotedocs_markdown::Pipeline;
use remotedocs_shared::{
    AppConfig, FetchConfig, RegisteredSource, RemoteDocsError, Result, SourceRegistry,
};

use crate::writer::{SiteWriter, sha256_hex};

/// Configuration for [`build_site`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root every source `out_dir` is resolved against.
    pub content_root: PathBuf,
    /// HTTP client settings.
    pub fetch: FetchConfig,
}

impl BuildConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            content_root: PathBuf::from(&config.site.content_root),
            fetch: config.fetch.clone(),
        }
    }
}

/// One file landed in the site tree.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub source: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 of the bytes written.
    pub sha256: String,
    /// Whether the document went through the markdown pipeline.
    pub transformed: bool,
}

/// Result of [`build_site`].
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub generated_at: DateTime<Utc>,
    /// Number of sources built.
    pub sources: usize,
    /// Written files, grouped by source in declaration order.
    pub files: Vec<WrittenFile>,
    pub elapsed_ms: u64,
}

impl BuildReport {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn transformed_count(&self) -> usize {
        self.files.iter().filter(|f| f.transformed).count()
    }
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a source's task is started.
    fn source_started(&self, name: &str, documents: usize);
    /// Called when every file of a source has been written.
    fn source_finished(&self, name: &str, files: &[WrittenFile]);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn source_started(&self, _name: &str, _documents: usize) {}
    fn source_finished(&self, _name: &str, _files: &[WrittenFile]) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Build every source of `registry` into the site tree.
///
/// Sources run concurrently, each with its own link rules. Within a source,
/// nothing is written until the whole fetch batch has succeeded. The first
/// failing source cancels the others and its error is returned once every
/// task has stopped, so no file lands after this returns. Files written
/// before the failure stay on disk.
#[instrument(
    skip_all,
    fields(sources = registry.len(), content_root = %config.content_root.display())
)]
pub async fn build_site(
    config: &BuildConfig,
    registry: &SourceRegistry,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();
    let generated_at = Utc::now();

    let fetcher = Fetcher::new(&config.fetch)?;
    let writer = SiteWriter::new(&config.content_root);

    // Compile every source's link rules before the first request.
    let pipelines = registry
        .iter()
        .map(|registered| source_pipeline(registered).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;

    info!(sources = registry.len(), "starting build");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();
    let mut task_sources = HashMap::new();

    for ((index, registered), pipeline) in registry.iter().enumerate().zip(pipelines) {
        progress.source_started(&registered.source.name, registered.source.documents.len());

        let handle = tasks.spawn(build_source(
            fetcher.clone(),
            pipeline,
            writer.clone(),
            registered.clone(),
            cancel_rx.clone(),
        ));
        task_sources.insert(handle.id(), (index, registered.source.name.clone()));
    }

    let mut per_source: Vec<Option<Vec<WrittenFile>>> = vec![None; registry.len()];
    let mut failure: Option<RemoteDocsError> = None;

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                let name = task_sources
                    .get(&e.id())
                    .map(|(_, name)| name.clone())
                    .unwrap_or_default();
                let err = RemoteDocsError::fetch(name, "*", format!("build task failed: {e}"));
                (e.id(), Err(err))
            }
        };

        if failure.is_some() {
            continue;
        }

        let Some((index, name)) = task_sources.get(&id) else {
            continue;
        };

        match outcome {
            Ok(files) => {
                progress.source_finished(name, &files);
                per_source[*index] = Some(files);
            }
            Err(e) => {
                warn!(
                    source = %name,
                    stage = e.stage(),
                    error = %e,
                    "source failed, cancelling build"
                );
                let _ = cancel_tx.send(true);
                failure = Some(e);
            }
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }

    let report = BuildReport {
        generated_at,
        sources: registry.len(),
        files: per_source.into_iter().flatten().flatten().collect(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        sources = report.sources,
        files = report.files.len(),
        transformed = report.transformed_count(),
        bytes = report.total_bytes(),
        elapsed_ms = report.elapsed_ms,
        "build complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Compile the link rules of one source, naming the source on failure.
fn source_pipeline(registered: &RegisteredSource) -> Result<Pipeline> {
    let source = &registered.source;
    Pipeline::from_rules(&source.link_rewrites).map_err(|e| match e {
        RemoteDocsError::Config { message } => {
            RemoteDocsError::config(format!("source '{}': {message}", source.name))
        }
        other => other,
    })
}

/// Fetch, transform and write one source.
///
/// Returns early with no files once `cancel` flips to `true`. Writes already
/// in progress finish; later ones are skipped.
#[instrument(skip_all, fields(source = %registered.source.name))]
async fn build_source(
    fetcher: Fetcher,
    pipeline: Arc<Pipeline>,
    writer: SiteWriter,
    registered: RegisteredSource,
    mut cancel: watch::Receiver<bool>,
) -> Result<Vec<WrittenFile>> {
    // Dropping the fetch future aborts its outstanding requests.
    let documents = tokio::select! {
        fetched = fetcher.fetch_source(&registered.source) => fetched?,
        _ = cancel.wait_for(|cancelled| *cancelled) => {
            debug!("cancelled before fetch completed");
            return Ok(Vec::new());
        }
    };
    let out_root = writer.content_root().join(&registered.source.out_dir);

    // Transform and write are synchronous; keep them off the async workers.
    tokio::task::spawn_blocking(move || -> Result<Vec<WrittenFile>> {
        let RegisteredSource { source, hook } = registered;

        // Transform the whole batch before the first write.
        let transformed = documents
            .into_iter()
            .map(|doc| {
                let was_markdown = doc.is_markdown();
                pipeline
                    .transform(doc, hook.as_deref())
                    .map(|doc| (doc, was_markdown))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut files = Vec::with_capacity(transformed.len());
        for (doc, transformed) in transformed {
            if *cancel.borrow() {
                debug!(written = files.len(), "cancelled, skipping remaining writes");
                return Ok(files);
            }
            let path = writer.write(&source.out_dir, &doc.relative_path, &doc.bytes)?;

            files.push(WrittenFile {
                source: source.name.clone(),
                path,
                size_bytes: doc.bytes.len() as u64,
                sha256: sha256_hex(&doc.bytes),
                transformed,
            });
        }

        info!(files = files.len(), out_dir = %source.out_dir, "source written");
        Ok(files)
    })
    .await
    .map_err(|e| {
        RemoteDocsError::io(
            out_root,
            std::io::Error::other(format!("write task failed: {e}")),
        )
    })?
}
