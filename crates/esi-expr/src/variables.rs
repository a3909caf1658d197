//! Variable-resolution capability shared by the evaluator and by
//! `$(...)` placeholder substitution.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// A once-computed value cell: resolved on first use, reused thereafter.
pub struct Lazy<T> {
    cell: OnceLock<T>,
    init: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> Lazy<T> {
    /// A cell that resolves through `init` on first access.
    pub fn new(init: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            init: Box::new(init),
        }
    }

    pub fn get(&self) -> &T {
        self.cell.get_or_init(|| (self.init)())
    }
}

impl<T: Clone + Send + Sync + 'static> Lazy<T> {
    /// A cell that is already resolved.
    pub fn ready(value: T) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value.clone());
        Self {
            cell,
            init: Box::new(move || value.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => write!(f, "Lazy({value:?})"),
            None => write!(f, "Lazy(<unresolved>)"),
        }
    }
}

/// Resolves one variable name, either to a single string or to a
/// dictionary of keyed strings.
#[derive(Debug)]
pub enum VariableResolver {
    Simple(Lazy<String>),
    Dictionary(Lazy<HashMap<String, String>>),
}

impl VariableResolver {
    /// A simple variable with a ready value.
    pub fn simple(value: impl Into<String>) -> Self {
        Self::Simple(Lazy::ready(value.into()))
    }

    /// A simple variable resolved on first use.
    pub fn simple_with(init: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self::Simple(Lazy::new(init))
    }

    /// A dictionary variable with a ready value.
    pub fn dictionary(values: HashMap<String, String>) -> Self {
        Self::Dictionary(Lazy::ready(values))
    }

    /// A dictionary variable resolved on first use.
    pub fn dictionary_with(
        init: impl Fn() -> HashMap<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self::Dictionary(Lazy::new(init))
    }

    /// Resolve to a string. A dictionary accessed without a key, a
    /// simple variable accessed with one, and a missing key all yield
    /// the empty string.
    pub fn resolve(&self, key: Option<&str>) -> String {
        match (self, key) {
            (Self::Simple(value), None) => value.get().clone(),
            (Self::Simple(_), Some(_)) => String::new(),
            (Self::Dictionary(values), Some(key)) => {
                values.get().get(key).cloned().unwrap_or_default()
            }
            (Self::Dictionary(_), None) => String::new(),
        }
    }
}

/// Per-request variable bindings, keyed by variable name.
pub type VariableMap = HashMap<String, VariableResolver>;

/// Resolve `name` (optionally keyed) against `variables`. An unbound
/// name yields the empty string, never an error.
pub fn resolve_variable(variables: &VariableMap, name: &str, key: Option<&str>) -> String {
    variables
        .get(name)
        .map(|resolver| resolver.resolve(key))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_lazy_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Lazy::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            String::from("value")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(lazy.get(), "value");
        assert_eq!(lazy.get(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ready_never_runs_init() {
        let lazy = Lazy::ready(String::from("ready"));
        assert_eq!(lazy.get(), "ready");
    }

    #[test]
    fn test_simple_resolution() {
        let resolver = VariableResolver::simple("example.com");
        assert_eq!(resolver.resolve(None), "example.com");
        assert_eq!(resolver.resolve(Some("key")), "");
    }

    #[test]
    fn test_dictionary_resolution() {
        let resolver = VariableResolver::dictionary(HashMap::from([(
            String::from("showPricesWithVat"),
            String::from("true"),
        )]));
        assert_eq!(resolver.resolve(Some("showPricesWithVat")), "true");
        assert_eq!(resolver.resolve(Some("missing")), "");
        assert_eq!(resolver.resolve(None), "");
    }

    #[test]
    fn test_unbound_name_resolves_empty() {
        let variables = VariableMap::new();
        assert_eq!(resolve_variable(&variables, "WHATEVER", None), "");
        assert_eq!(resolve_variable(&variables, "WHATEVER", Some("key")), "");
    }
}
