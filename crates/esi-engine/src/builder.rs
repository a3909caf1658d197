//! Wiring of the processing facade.

use std::sync::Arc;

use esi_cache::{CacheFacade, FragmentCache, MemoryFragmentCache, MemoryVaryStore, VaryStore};
use esi_core::{FragmentKind, DEFAULT_MAX_INCLUDE_DEPTH};
use esi_exec::{ExecuteInterceptor, FragmentExecutor};
use esi_http::{HttpFetch, HttpIncludeLoader};
use esi_markup::{EsiBodyParser, ParseInterceptor, TagParser};

use crate::processor::EsiProcessor;

/// Builds an [`EsiProcessor`]. Only the fetch capability is required;
/// everything else defaults to the in-process implementations.
pub struct EsiProcessorBuilder {
    fetch: Arc<dyn HttpFetch>,
    cache: Option<Arc<dyn FragmentCache>>,
    vary: Option<Arc<dyn VaryStore>>,
    tag_parsers: Vec<(String, Arc<dyn TagParser>)>,
    parse_interceptors: Vec<(String, ParseInterceptor)>,
    execute_interceptors: Vec<(FragmentKind, ExecuteInterceptor)>,
    max_include_depth: usize,
}

impl EsiProcessorBuilder {
    pub fn new(fetch: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetch,
            cache: None,
            vary: None,
            tag_parsers: Vec::new(),
            parse_interceptors: Vec::new(),
            execute_interceptors: Vec::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Cache backend shared by page-level and include-level entries.
    pub fn with_cache(mut self, cache: Arc<dyn FragmentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_vary_store(mut self, vary: Arc<dyn VaryStore>) -> Self {
        self.vary = Some(vary);
        self
    }

    /// Register or replace the parser for one tag name.
    pub fn with_tag_parser(mut self, tag: impl Into<String>, parser: Arc<dyn TagParser>) -> Self {
        self.tag_parsers.push((tag.into(), parser));
        self
    }

    /// Register a parse interceptor for one tag name; the first
    /// registered is outermost.
    pub fn with_parse_interceptor(
        mut self,
        tag: impl Into<String>,
        interceptor: ParseInterceptor,
    ) -> Self {
        self.parse_interceptors.push((tag.into(), interceptor));
        self
    }

    /// Register an execute interceptor for one fragment kind; the
    /// first registered is outermost.
    pub fn with_execute_interceptor(
        mut self,
        kind: FragmentKind,
        interceptor: ExecuteInterceptor,
    ) -> Self {
        self.execute_interceptors.push((kind, interceptor));
        self
    }

    /// Bound on nested include resolution.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn build(self) -> EsiProcessor {
        let cache: Arc<dyn FragmentCache> = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryFragmentCache::new()));
        let vary: Arc<dyn VaryStore> = self
            .vary
            .unwrap_or_else(|| Arc::new(MemoryVaryStore::new()));

        let mut parser = EsiBodyParser::new();
        for (tag, tag_parser) in self.tag_parsers {
            parser = parser.with_tag_parser(tag, tag_parser);
        }
        for (tag, interceptor) in self.parse_interceptors {
            parser = parser.with_interceptor(tag, interceptor);
        }
        let parser = Arc::new(parser);

        let facade = Arc::new(CacheFacade::new(Arc::clone(&cache), vary));
        let loader = Arc::new(HttpIncludeLoader::new(
            self.fetch,
            facade,
            Arc::clone(&parser),
        ));

        let mut executor = FragmentExecutor::new(loader);
        for (kind, interceptor) in self.execute_interceptors {
            executor = executor.with_interceptor(kind, interceptor);
        }

        EsiProcessor {
            parser,
            executor: Arc::new(executor),
            page_cache: cache,
            max_include_depth: self.max_include_depth,
        }
    }
}
