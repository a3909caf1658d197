//! Response processing: parse, page-level cache, execute.

use std::collections::BTreeMap;
use std::sync::Arc;

use esi_cache::{storable_headers, CacheEntry, CachePolicy, FragmentCache, StoredHeaders};
use esi_core::{ExecutionContext, RequestDescriptor};
use esi_exec::{ExecuteError, FragmentExecutor};
use esi_http::ESI_MARKER_HEADER;
use esi_markup::{EsiBodyParser, MarkupError};
use tracing::{debug, warn};

/// The response produced by the host pipeline, before ESI processing.
#[derive(Debug, Clone)]
pub struct HostResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl HostResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into().to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }
}

/// Outcome of processing one response.
#[derive(Debug, PartialEq)]
pub enum ProcessOutcome {
    /// The response is not ours to touch (a sub-request, or 304): the
    /// host forwards it unchanged.
    Passthrough,
    /// The body was rendered from a fragment tree.
    Rendered(RenderedBody),
}

/// Ordered output chunks, plus the stored response headers to replay
/// when the fragment came from the page cache.
#[derive(Debug, PartialEq)]
pub struct RenderedBody {
    pub chunks: Vec<String>,
    pub replay_headers: Option<StoredHeaders>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// Processes host responses: parses the body into a fragment tree
/// (cached page-level by request URL), then executes the tree into
/// ordered output chunks.
pub struct EsiProcessor {
    pub(crate) parser: Arc<EsiBodyParser>,
    pub(crate) executor: Arc<FragmentExecutor>,
    pub(crate) page_cache: Arc<dyn FragmentCache>,
    pub(crate) max_include_depth: usize,
}

impl EsiProcessor {
    pub async fn process(
        &self,
        request: &RequestDescriptor,
        response: &HostResponse,
    ) -> Result<ProcessOutcome, EngineError> {
        if response.status == 304 || request.header(ESI_MARKER_HEADER).is_some() {
            return Ok(ProcessOutcome::Passthrough);
        }

        let key = request.url();
        let (fragment, replay_headers) = match self.cached_page(&key).await {
            Some(entry) => {
                debug!(key = %key, "page served from cache");
                (entry.fragment, Some(entry.headers))
            }
            None => {
                let fragment = self.parser.parse(&response.body)?;
                self.maybe_cache_page(&key, response, &fragment).await;
                (fragment, None)
            }
        };

        let context = ExecutionContext::for_request(request.clone())
            .with_max_include_depth(self.max_include_depth);
        let chunks = self.executor.execute(&fragment, &context).await?;
        Ok(ProcessOutcome::Rendered(RenderedBody {
            chunks,
            replay_headers,
        }))
    }

    async fn cached_page(&self, key: &str) -> Option<CacheEntry> {
        match self.page_cache.try_get(key).await {
            Ok(found) => found,
            Err(error) => {
                warn!(%error, key = %key, "page cache read failed; treating as miss");
                None
            }
        }
    }

    /// A 200 response whose `Cache-Control` permits storage caches the
    /// parsed fragment with the response headers worth replaying.
    async fn maybe_cache_page(&self, key: &str, response: &HostResponse, fragment: &esi_core::Fragment) {
        if response.status != 200 {
            return;
        }
        let CachePolicy::Store(ttl) = CachePolicy::from_cache_control(response.header("cache-control"))
        else {
            return;
        };
        let entry = CacheEntry::new(fragment.clone(), storable_headers(&response.headers));
        if let Err(error) = self.page_cache.set(key, ttl, entry).await {
            warn!(%error, key = %key, "page cache write failed; entry dropped");
        }
    }
}
