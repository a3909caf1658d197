//! Cache-aware include resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use esi_cache::{parse_vary_header, storable_headers, CacheEntry, CacheFacade, CachePolicy};
use esi_core::{ExecutionContext, IncludeError, IncludeLoader, LoadedInclude, RequestDescriptor};
use esi_markup::EsiBodyParser;
use tracing::debug;

use crate::fetch::HttpFetch;
use crate::uri::resolve_uri;

/// Marker header attached to sub-requests so the host skips ESI
/// processing for them instead of recursing.
pub const ESI_MARKER_HEADER: &str = "x-esi";

/// Request headers forwarded to include targets.
const FORWARDED_HEADERS: &[&str] = &["cookie", "accept-language"];

/// Resolves includes by consulting the fragment cache, fetching on a
/// miss, re-parsing the fetched body and caching it when the response
/// allows.
pub struct HttpIncludeLoader {
    fetch: Arc<dyn HttpFetch>,
    cache: Arc<CacheFacade>,
    parser: Arc<EsiBodyParser>,
}

impl HttpIncludeLoader {
    pub fn new(
        fetch: Arc<dyn HttpFetch>,
        cache: Arc<CacheFacade>,
        parser: Arc<EsiBodyParser>,
    ) -> Self {
        Self {
            fetch,
            cache,
            parser,
        }
    }
}

#[async_trait]
impl IncludeLoader for HttpIncludeLoader {
    async fn load(
        &self,
        src: &str,
        context: &ExecutionContext,
    ) -> Result<LoadedInclude, IncludeError> {
        let uri = resolve_uri(src, context.request());

        if let Some(entry) = self.cache.try_get(&uri, context.request()).await {
            debug!(uri = %uri, "include served from cache");
            return Ok(LoadedInclude {
                fragment: entry.fragment,
                headers: entry.headers,
                uri,
            });
        }

        let response = self
            .fetch
            .get(&uri, &forwarded_headers(context.request()))
            .await
            .map_err(|error| IncludeError::Fetch {
                uri: uri.clone(),
                reason: error.to_string(),
            })?;
        if response.status != 200 {
            return Err(IncludeError::Status {
                uri,
                status: response.status,
            });
        }

        let fragment = self
            .parser
            .parse(&response.body)
            .map_err(|error| IncludeError::Parse {
                uri: uri.clone(),
                reason: error.to_string(),
            })?;
        let headers = storable_headers(&response.headers);

        if let CachePolicy::Store(ttl) = CachePolicy::from_cache_control(response.header("cache-control")) {
            let vary_names = parse_vary_header(response.header_values("vary"));
            if vary_names.iter().any(|name| name == "*") {
                debug!(uri = %uri, "vary: * rules out caching");
            } else {
                self.cache
                    .store(
                        &uri,
                        context.request(),
                        vary_names,
                        ttl,
                        CacheEntry::new(fragment.clone(), headers.clone()),
                    )
                    .await;
            }
        }

        debug!(uri = %uri, "include fetched");
        Ok(LoadedInclude {
            fragment,
            headers,
            uri,
        })
    }
}

fn forwarded_headers(request: &RequestDescriptor) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = request.header(name) {
            headers.insert((*name).to_string(), value.to_string());
        }
    }
    headers.insert(String::from(ESI_MARKER_HEADER), String::from("1"));
    headers
}
