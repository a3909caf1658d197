//! TTL decisions from `Cache-Control` response headers.

use std::time::Duration;

/// Whether and for how long a response may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Store with the given time-to-live.
    Store(Duration),
    /// Do not call the cache at all.
    Bypass,
}

impl CachePolicy {
    /// Derive a policy from a `Cache-Control` header value. Storage
    /// requires a positive `max-age`; `no-store`, `no-cache` and
    /// `private` rule it out, as does a missing header.
    pub fn from_cache_control(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Bypass;
        };
        let mut max_age = None;
        for directive in value.split(',') {
            let directive = directive.trim();
            let (name, argument) = match directive.split_once('=') {
                Some((name, argument)) => (name.trim(), Some(argument.trim())),
                None => (directive, None),
            };
            match name.to_lowercase().as_str() {
                "no-store" | "no-cache" | "private" => return Self::Bypass,
                "max-age" => {
                    max_age = argument.and_then(|seconds| seconds.parse::<u64>().ok());
                }
                _ => {}
            }
        }
        match max_age {
            Some(seconds) if seconds > 0 => Self::Store(Duration::from_secs(seconds)),
            _ => Self::Bypass,
        }
    }

    pub fn stores(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Store(ttl) => Some(*ttl),
            Self::Bypass => None,
        }
    }
}
