//! Fetch capability supplied by the host.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// A fetched response. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl FetchResponse {
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

    /// First value of a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }

    /// All values of a header.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_lowercase())
            .map(|values| values.as_slice())
            .unwrap_or_default()
    }
}

/// Transport-level fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request error: {0}")]
    Request(String),
}

/// GET capability for include targets. The engine only issues GET
/// semantics; everything else about the transport is the host's.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(
        &self,
        uri: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, FetchError>;
}
