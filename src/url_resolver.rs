use url::{ParseError, Url};

/// Returns true when `reference` parses as an absolute URL with its own scheme.
///
/// Protocol-relative references (`//cdn.example.com/a.png`) and plain paths
/// have no scheme and are resolved against a base instead.
pub fn has_scheme(reference: &str) -> bool {
    Url::parse(reference)
        .map(|url| !url.scheme().is_empty())
        .unwrap_or(false)
}

/// Resolves `reference` against `base`.
///
/// References that carry a scheme are returned as they are; everything else is
/// joined with the usual relative-URL rules, inheriting scheme and host from
/// `base`.
pub fn resolve_relative(base: &Url, reference: &str) -> Result<Url, ParseError> {
    if has_scheme(reference) {
        Url::parse(reference)
    } else {
        base.join(reference)
    }
}
