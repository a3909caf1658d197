//! Host-facing ESI processing.
//!
//! This crate wires the parser, the executor, the include loader and
//! the caches into one facade:
//! - `EsiProcessor` - Processes one host response into output chunks
//! - `EsiProcessorBuilder` - Wires defaults, accepts host capabilities
//!
//! The host supplies the original response body and headers, forwards
//! or suppresses wire headers itself, and writes the returned chunks
//! to the network in order.
//!
//! ```ignore
//! use esi_engine::prelude::*;
//!
//! let processor = EsiProcessorBuilder::new(fetch).build();
//! match processor.process(&request, &response).await? {
//!     ProcessOutcome::Passthrough => forward_unchanged(response),
//!     ProcessOutcome::Rendered(body) => write_chunks(body.chunks),
//! }
//! ```

mod builder;
mod processor;

pub use builder::*;
pub use processor::*;

pub use esi_cache;
pub use esi_core;
pub use esi_exec;
pub use esi_http;
pub use esi_markup;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        EngineError, EsiProcessor, EsiProcessorBuilder, HostResponse, ProcessOutcome, RenderedBody,
    };
    pub use esi_cache::{CacheEntry, CacheError, FragmentCache, VaryStore};
    pub use esi_core::{Fragment, FragmentKind, RequestDescriptor};
    pub use esi_http::{FetchError, FetchResponse, HttpFetch};
}
