//! Concurrent document fetcher.
//!
//! Every document of a source is fetched as an independent task. A failing
//! document never cancels its siblings, but the batch as a whole fails so a
//! build can't silently ship without it. Dropping a `fetch_source` future
//! aborts its outstanding requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use remotedocs_shared::{
    ContentSource, Document, FetchConfig, RemoteDocsError, ResponseType, Result,
};

/// Redirects followed before a fetch is treated as failed.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP fetcher shared by all sources of a build.
///
/// Cloning is cheap; clones share the client and the concurrency limit.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl Fetcher {
    /// Create a fetcher with the given client settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteDocsError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1) as usize)),
        })
    }

    /// Fetch every document of `source`, in declaration order.
    ///
    /// All documents are attempted. If any failed, the first failure (in
    /// declaration order) is returned after every failure has been logged.
    #[instrument(skip_all, fields(source = %source.name, documents = source.documents.len()))]
    pub async fn fetch_source(&self, source: &ContentSource) -> Result<Vec<Document>> {
        let start = Instant::now();
        let response_type = source.fetch_options.response_type;

        let mut tasks = JoinSet::new();
        for (index, document) in source.documents.iter().enumerate() {
            let client = self.client.clone();
            let sem = self.semaphore.clone();
            let url = source.document_url(document);

            tasks.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => fetch_bytes(&client, &url, response_type).await,
                    Err(e) => Err(format!("fetch slot unavailable: {e}")),
                };
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<std::result::Result<Vec<u8>, String>>> =
            vec![None; source.documents.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => outcomes[index] = Some(result),
                Err(e) => warn!(error = %e, "fetch task failed"),
            }
        }

        let mut documents = Vec::with_capacity(outcomes.len());
        let mut first_error: Option<RemoteDocsError> = None;
        let mut failures = 0usize;

        for (document, outcome) in source.documents.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| Err("fetch task failed".to_string()));

            match outcome {
                Ok(bytes) => {
                    debug!(document = %document, bytes = bytes.len(), "fetched document");
                    documents.push(Document::new(&source.name, document, bytes));
                }
                Err(message) => {
                    warn!(document = %document, error = %message, "fetch failed");
                    failures += 1;
                    first_error.get_or_insert_with(|| {
                        RemoteDocsError::fetch(&source.name, document, message)
                    });
                }
            }
        }

        if let Some(err) = first_error {
            warn!(
                failed = failures,
                total = source.documents.len(),
                "source fetch incomplete"
            );
            return Err(err);
        }

        info!(
            fetched = documents.len(),
            bytes = documents.iter().map(|d| d.bytes.len()).sum::<usize>(),
            duration_ms = start.elapsed().as_millis(),
            "source fetched"
        );

        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// Single request
// ---------------------------------------------------------------------------

/// Fetch one URL, reading the body according to `response_type`.
async fn fetch_bytes(
    client: &Client,
    url: &str,
    response_type: ResponseType,
) -> std::result::Result<Vec<u8>, String> {
    debug!(%url, %response_type, "fetching");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("{url}: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("{url}: HTTP {status}"));
    }

    match response_type {
        ResponseType::Text => response
            .text()
            .await
            .map(String::into_bytes)
            .map_err(|e| format!("{url}: body read failed: {e}")),
        ResponseType::Binary => response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("{url}: body read failed: {e}")),
    }
}
