//! Native-request classification.
//!
//! The dispatcher never intercepts traffic that belongs to the host
//! server's own API. [`RequestClassifier`] is how it asks; the shipped
//! [`PathPrefixClassifier`] answers by path prefix.

use axum::body::Body;
use axum::http::Request;

pub trait RequestClassifier: Send + Sync {
    /// `path` is the request path after percent-decoding, the same form
    /// rule patterns are matched against.
    fn is_native(&self, req: &Request<Body>, path: &str) -> bool;
}

/// Native when the path equals a prefix or continues it with `/`.
#[derive(Debug, Clone, Default)]
pub struct PathPrefixClassifier {
    prefixes: Vec<String>,
}

impl PathPrefixClassifier {
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.into().trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    fn path_is_native(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl RequestClassifier for PathPrefixClassifier {
    fn is_native(&self, _req: &Request<Body>, path: &str) -> bool {
        self.path_is_native(path)
    }
}
