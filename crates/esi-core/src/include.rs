//! Include-resolution capability.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::fragment::Fragment;

/// A resolved include: the parsed sub-fragment plus the response
/// headers selected for replay by the host.
#[derive(Debug, Clone)]
pub struct LoadedInclude {
    pub fragment: Fragment,
    pub headers: BTreeMap<String, Vec<String>>,
    /// The absolute URI the include resolved to.
    pub uri: String,
}

/// Error type for include resolution. Recoverable only through an
/// enclosing `try` fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncludeError {
    #[error("fetching '{uri}' failed: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("include target '{uri}' answered status {status}")]
    Status { uri: String, status: u16 },

    #[error("body of '{uri}' failed to parse: {reason}")]
    Parse { uri: String, reason: String },

    #[error("include depth {depth} exceeded while resolving '{uri}'")]
    TooDeep { uri: String, depth: usize },
}

/// Capability for resolving an include source into a fragment, fetched
/// or served from cache. Supplied to the executor by the host wiring.
#[async_trait]
pub trait IncludeLoader: Send + Sync {
    async fn load(&self, src: &str, context: &ExecutionContext)
        -> Result<LoadedInclude, IncludeError>;
}
