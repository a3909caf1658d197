//! Resolution of include sources against the current request.

use esi_core::RequestDescriptor;

/// Resolve an include `src` to an absolute URI. Absolute sources pass
/// through; scheme-relative, host-relative and path-relative sources
/// resolve against the current request. Dot segments are not
/// normalized.
pub fn resolve_uri(src: &str, request: &RequestDescriptor) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }
    if let Some(rest) = src.strip_prefix("//") {
        return format!("{}://{}", request.scheme, rest);
    }
    if src.starts_with('/') {
        return format!("{}://{}{}", request.scheme, request.host, src);
    }
    let directory = match request.path.rfind('/') {
        Some(index) => &request.path[..=index],
        None => "/",
    };
    format!("{}://{}{}{}", request.scheme, request.host, directory, src)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RequestDescriptor {
        RequestDescriptor::new("https", "shop.example", "/products/detail")
    }

    #[test]
    fn test_absolute_passthrough() {
        assert_eq!(
            resolve_uri("http://other.example/f", &request()),
            "http://other.example/f"
        );
        assert_eq!(
            resolve_uri("https://other.example/f", &request()),
            "https://other.example/f"
        );
    }

    #[test]
    fn test_scheme_relative() {
        assert_eq!(
            resolve_uri("//cdn.example/f", &request()),
            "https://cdn.example/f"
        );
    }

    #[test]
    fn test_host_relative() {
        assert_eq!(
            resolve_uri("/fragments/header", &request()),
            "https://shop.example/fragments/header"
        );
    }

    #[test]
    fn test_path_relative() {
        assert_eq!(
            resolve_uri("reviews", &request()),
            "https://shop.example/products/reviews"
        );
    }

    #[test]
    fn test_path_relative_with_empty_path() {
        let request = RequestDescriptor::new("http", "host", "");
        assert_eq!(resolve_uri("f", &request), "http://host/f");
    }
}
