//! The value stored per cache key.

use std::collections::BTreeMap;

use esi_core::Fragment;
use serde::{Deserialize, Serialize};

/// Response headers as stored alongside a fragment, names lowercase.
pub type StoredHeaders = BTreeMap<String, Vec<String>>;

/// A parsed fragment plus the response headers selected for replay.
/// The concrete serialization codec is the backend's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fragment: Fragment,
    pub headers: StoredHeaders,
}

impl CacheEntry {
    pub fn new(fragment: Fragment, headers: StoredHeaders) -> Self {
        Self { fragment, headers }
    }
}

/// Hop-by-hop and entity-length headers, which must not be replayed
/// from cache.
const SKIPPED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "content-encoding",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "upgrade",
];

/// The subset of response headers worth storing, names lowercased.
pub fn storable_headers(headers: &BTreeMap<String, Vec<String>>) -> StoredHeaders {
    headers
        .iter()
        .filter_map(|(name, values)| {
            let name = name.to_lowercase();
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                None
            } else {
                Some((name, values.clone()))
            }
        })
        .collect()
}
