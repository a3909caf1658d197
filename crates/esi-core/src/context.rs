//! Per-request execution state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use esi_expr::{VariableMap, VariableResolver};

/// Default bound on nested include resolution. Exceeding it fails the
/// include like a fetch failure, so an enclosing `try` can recover.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

/// The request a response body is being rendered for. Header names are
/// stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }

    /// The full request URL, used as the page-level cache key.
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}://{}{}?{}", self.scheme, self.host, self.path, query),
            None => format!("{}://{}{}", self.scheme, self.host, self.path),
        }
    }
}

/// Per-request state shared by the executor, the expression evaluator
/// and the include loader. Cloning is cheap; `descend` produces the
/// context for one include level deeper.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    request: Arc<RequestDescriptor>,
    variables: Arc<VariableMap>,
    depth: usize,
    max_include_depth: usize,
}

impl ExecutionContext {
    /// Build a context with the standard ESI variable set derived from
    /// the request.
    pub fn for_request(request: RequestDescriptor) -> Self {
        Self::with_variables(request, VariableMap::new())
    }

    /// Build a context with the standard variable set plus `extra`
    /// bindings (which win on name collisions).
    pub fn with_variables(request: RequestDescriptor, extra: VariableMap) -> Self {
        let request = Arc::new(request);
        let mut variables = standard_variables(&request);
        variables.extend(extra);
        Self {
            request,
            variables: Arc::new(variables),
            depth: 0,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn depth_exceeded(&self) -> bool {
        self.depth >= self.max_include_depth
    }

    /// The context for executing a fetched include body.
    pub fn descend(&self) -> Self {
        let mut child = self.clone();
        child.depth += 1;
        child
    }
}

/// The standard ESI variable set: request headers as simple variables,
/// cookies and the query string as dictionaries. Everything is
/// resolved lazily, once per request.
fn standard_variables(request: &Arc<RequestDescriptor>) -> VariableMap {
    let mut variables = VariableMap::new();
    variables.insert(
        String::from("HTTP_HOST"),
        VariableResolver::simple(request.host.clone()),
    );
    for (variable, header) in [
        ("HTTP_REFERER", "referer"),
        ("HTTP_USER_AGENT", "user-agent"),
        ("HTTP_ACCEPT_LANGUAGE", "accept-language"),
    ] {
        let request = Arc::clone(request);
        variables.insert(
            String::from(variable),
            VariableResolver::simple_with(move || {
                request.header(header).unwrap_or_default().to_string()
            }),
        );
    }
    let cookie_request = Arc::clone(request);
    variables.insert(
        String::from("HTTP_COOKIE"),
        VariableResolver::dictionary_with(move || {
            parse_cookies(cookie_request.header("cookie").unwrap_or_default())
        }),
    );
    let query_request = Arc::clone(request);
    variables.insert(
        String::from("QUERY_STRING"),
        VariableResolver::dictionary_with(move || {
            parse_query(query_request.query.as_deref().unwrap_or_default())
        }),
    );
    variables
}

fn parse_cookies(header: &str) -> HashMap<String, String> {
    parse_pairs(header, ';')
}

fn parse_query(query: &str) -> HashMap<String, String> {
    parse_pairs(query, '&')
}

/// `name=value` pairs; a bare name maps to the empty string. Values
/// are kept verbatim.
fn parse_pairs(input: &str, separator: char) -> HashMap<String, String> {
    input
        .split(separator)
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            match pair.split_once('=') {
                Some((name, value)) => Some((name.trim().to_string(), value.to_string())),
                None => Some((pair.to_string(), String::new())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use esi_expr::resolve_variable;

    fn request() -> RequestDescriptor {
        RequestDescriptor::new("https", "example.com", "/pages/start")
            .with_query("page=2&sort=asc")
            .with_header("Referer", "https://referrer.example")
            .with_header("Cookie", "showPricesWithVat=true; theme=dark")
    }

    #[test]
    fn test_url_includes_query() {
        assert_eq!(request().url(), "https://example.com/pages/start?page=2&sort=asc");
        assert_eq!(
            RequestDescriptor::new("http", "host", "/f").url(),
            "http://host/f"
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = request();
        assert_eq!(request.header("REFERER"), Some("https://referrer.example"));
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn test_standard_variables() {
        let context = ExecutionContext::for_request(request());
        let variables = context.variables();
        assert_eq!(resolve_variable(variables, "HTTP_HOST", None), "example.com");
        assert_eq!(
            resolve_variable(variables, "HTTP_REFERER", None),
            "https://referrer.example"
        );
        assert_eq!(resolve_variable(variables, "HTTP_USER_AGENT", None), "");
        assert_eq!(
            resolve_variable(variables, "HTTP_COOKIE", Some("showPricesWithVat")),
            "true"
        );
        assert_eq!(resolve_variable(variables, "HTTP_COOKIE", Some("theme")), "dark");
        assert_eq!(resolve_variable(variables, "QUERY_STRING", Some("page")), "2");
        assert_eq!(resolve_variable(variables, "QUERY_STRING", Some("missing")), "");
    }

    #[test]
    fn test_extra_variables_win_over_standard() {
        let extra = VariableMap::from([(
            String::from("HTTP_HOST"),
            VariableResolver::simple("override.example"),
        )]);
        let context = ExecutionContext::with_variables(request(), extra);
        assert_eq!(
            resolve_variable(context.variables(), "HTTP_HOST", None),
            "override.example"
        );
    }

    #[test]
    fn test_descend_tracks_depth() {
        let context = ExecutionContext::for_request(request()).with_max_include_depth(2);
        assert_eq!(context.depth(), 0);
        assert!(!context.depth_exceeded());
        let deeper = context.descend().descend();
        assert_eq!(deeper.depth(), 2);
        assert!(deeper.depth_exceeded());
    }
}
