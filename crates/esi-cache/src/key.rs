//! Vary-aware cache key composition.

use std::collections::HashMap;
use std::sync::RwLock;

use esi_core::RequestDescriptor;

/// Records, per base key, which request header names the response has
/// declared it varies on.
pub trait VaryStore: Send + Sync {
    /// The recorded header names, normalized and sorted, if any.
    fn get(&self, base_key: &str) -> Option<Vec<String>>;

    /// Record the header names for a base key, replacing any previous
    /// recording.
    fn record(&self, base_key: &str, header_names: Vec<String>);
}

/// In-process vary store, suitable for development and tests.
#[derive(Debug, Default)]
pub struct MemoryVaryStore {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryVaryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaryStore for MemoryVaryStore {
    fn get(&self, base_key: &str) -> Option<Vec<String>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(base_key).cloned())
    }

    fn record(&self, base_key: &str, header_names: Vec<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(base_key.to_string(), header_names);
        }
    }
}

/// Normalize a `Vary` response header: split on commas, trim,
/// lowercase, sort, dedup. `*` is preserved as-is and rules out
/// caching at the call site.
pub fn parse_vary_header(values: &[String]) -> Vec<String> {
    let mut names: Vec<String> = values
        .iter()
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Fold the current request's values for the varied header names into
/// the base key. Names are expected sorted, so equal requests always
/// produce equal keys.
pub fn vary_key(base_key: &str, vary_names: &[String], request: &RequestDescriptor) -> String {
    if vary_names.is_empty() {
        return base_key.to_string();
    }
    let mut key = String::from(base_key);
    for name in vary_names {
        key.push_str("|h:");
        key.push_str(name);
        key.push('=');
        key.push_str(request.header(name).unwrap_or_default());
    }
    key
}
