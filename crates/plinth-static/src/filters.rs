//! Template filters available to every page.

use minijinja::Environment;
use rand::Rng;

/// Exclusive upper bound for generated id suffixes.
const RANDOM_ID_SPAN: u32 = 1_000_000;

/// Build an element id from a prefix and a random numeric suffix,
/// e.g. `accordion-482113`.
pub fn random_id_string(prefix: &str) -> String {
    let suffix = rand::rng().random_range(0..RANDOM_ID_SPAN);
    format!("{prefix}-{suffix}")
}

/// Append `s` to a term unless the count is exactly one.
pub fn pluralize(term: &str, count: i64) -> String {
    if count == 1 {
        term.to_string()
    } else {
        format!("{term}s")
    }
}

/// Prepend the deployment path prefix to a site-absolute path. An empty
/// prefix leaves the path untouched.
pub fn prefixed_url(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    let prefix = prefix.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// Register the filter set on a template environment.
pub fn register(env: &mut Environment<'static>, path_prefix: &str) {
    env.add_filter("generateRandomIdString", |prefix: String| {
        random_id_string(&prefix)
    });
    env.add_filter("pluralize", |term: String, count: Option<i64>| {
        pluralize(&term, count.unwrap_or(1))
    });
    let prefix = path_prefix.to_string();
    env.add_filter("url", move |path: String| prefixed_url(&prefix, &path));
}
