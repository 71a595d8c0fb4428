//! Upstream resolution and request-target rewriting.
//!
//! [`resolve`] turns a rule's upstream descriptor into a [`Target`]
//! without any network I/O. [`Target::locate`] then produces the absolute
//! URI a request is forwarded to: the upstream's scheme and authority, the
//! upstream path prefix followed by the original path, and the original
//! query.

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use url::Url;

use crate::config::model::RoutingRule;
use crate::error::DetourError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub authority: Authority,
    /// Prepended verbatim to the request path. Empty for a bare host.
    pub path_prefix: String,
}

pub fn resolve(rule: &RoutingRule) -> Result<Target, DetourError> {
    let raw = rule.upstream.raw_url();
    let fail = |reason: String| DetourError::UpstreamResolution {
        rule: rule.name.clone(),
        raw: raw.clone(),
        reason,
    };

    let url = Url::parse(&raw).map_err(|e| fail(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" => Scheme::HTTP,
        "https" => Scheme::HTTPS,
        other => return Err(fail(format!("unsupported scheme '{other}'"))),
    };

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| fail("missing host".into()))?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let authority = authority
        .parse::<Authority>()
        .map_err(|e| fail(e.to_string()))?;

    // `url` always reports at least "/" for http(s); a bare host means no prefix.
    let path_prefix = match url.path() {
        "/" => String::new(),
        path => path.to_string(),
    };

    Ok(Target {
        scheme,
        authority,
        path_prefix,
    })
}

impl Target {
    /// Absolute URI for `original` on this upstream.
    pub fn locate(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = match original.query() {
            Some(query) => format!("{}{}?{query}", self.path_prefix, original.path()),
            None => format!("{}{}", self.path_prefix, original.path()),
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query.parse::<PathAndQuery>()?)
            .build()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Matcher, RuleState, ServiceReference, Upstream};

    fn rule_with(upstream: Upstream) -> RoutingRule {
        RoutingRule {
            name: "svc".into(),
            state: RuleState::Available,
            matcher: Matcher {
                method: "*".into(),
                path: "^/".into(),
            },
            upstream,
        }
    }

    fn target(url: &str) -> Result<Target, DetourError> {
        resolve(&rule_with(Upstream::url(url)))
    }

    #[test]
    fn splits_scheme_host_and_prefix() {
        let t = target("http://svc-a:8080/base").unwrap();
        assert_eq!(t.scheme, Scheme::HTTP);
        assert_eq!(t.authority.as_str(), "svc-a:8080");
        assert_eq!(t.path_prefix, "/base");
    }

    #[test]
    fn bare_host_has_no_prefix() {
        let t = target("https://svc.example.com").unwrap();
        assert_eq!(t.path_prefix, "");
        assert_eq!(t.authority.as_str(), "svc.example.com");
    }

    #[test]
    fn default_port_is_left_implicit() {
        let t = target("http://svc:80/x").unwrap();
        assert_eq!(t.authority.as_str(), "svc");
    }

    #[test]
    fn ipv6_host_keeps_brackets() {
        let t = target("http://[::1]:9000").unwrap();
        assert_eq!(t.authority.as_str(), "[::1]:9000");
    }

    #[test]
    fn malformed_url_fails() {
        let err = target("not a url").unwrap_err();
        assert!(matches!(err, DetourError::UpstreamResolution { ref rule, .. } if rule == "svc"));
    }

    #[test]
    fn non_http_scheme_fails() {
        let err = target("ftp://files:21/pub").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn empty_descriptor_fails() {
        assert!(resolve(&rule_with(Upstream::default())).is_err());
    }

    #[test]
    fn service_reference_resolves_to_https() {
        let t = resolve(&rule_with(Upstream {
            url: None,
            service: Some(ServiceReference {
                name: "console".into(),
                namespace: "system".into(),
                port: 8443,
                path: Some("/ui".into()),
            }),
        }))
        .unwrap();
        assert_eq!(t.to_string(), "https://console.system.svc:8443/ui");
    }

    #[test]
    fn locate_prefixes_path_and_keeps_query() {
        let t = target("http://svc-a:8080/base").unwrap();
        let uri: Uri = "/foo/bar?x=1".parse().unwrap();
        assert_eq!(
            t.locate(&uri).unwrap().to_string(),
            "http://svc-a:8080/base/foo/bar?x=1"
        );
    }

    #[test]
    fn locate_replaces_absolute_form_authority() {
        let t = target("https://upstream:9443").unwrap();
        let uri: Uri = "http://front.example.com/ws?token=a%20b".parse().unwrap();
        assert_eq!(
            t.locate(&uri).unwrap().to_string(),
            "https://upstream:9443/ws?token=a%20b"
        );
    }

    #[test]
    fn locate_concatenates_prefix_verbatim() {
        let t = target("http://svc/base/").unwrap();
        let uri: Uri = "/foo".parse().unwrap();
        assert_eq!(t.locate(&uri).unwrap().path(), "/base//foo");
    }
}
