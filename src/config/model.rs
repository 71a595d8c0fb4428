//! Serde data structures for routing rule files.
//!
//! A [`RuleSet`] is an ordered list of [`RoutingRule`]s. Each rule pairs a
//! [`Matcher`] (method and path regex) with an [`Upstream`] and carries a
//! [`RuleState`] that gates whether it takes part in matching at all.

use serde::{Deserialize, Serialize};

/// Wildcard accepted in [`Matcher::method`].
pub const ANY_METHOD: &str = "*";

const DEFAULT_SERVICE_PORT: u16 = 443;

fn default_method() -> String {
    ANY_METHOD.to_string()
}

const fn default_service_port() -> u16 {
    DEFAULT_SERVICE_PORT
}

fn is_any_method(v: &str) -> bool {
    v == ANY_METHOD
}

fn is_default_service_port(v: &u16) -> bool {
    *v == DEFAULT_SERVICE_PORT
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl RuleSet {
    #[must_use]
    pub fn available(&self) -> usize {
        self.rules.iter().filter(|r| r.is_available()).count()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingRule {
    pub name: String,

    #[serde(default)]
    pub state: RuleState,

    pub matcher: Matcher,

    pub upstream: Upstream,
}

impl RoutingRule {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == RuleState::Available
    }
}

/// Lifecycle state of a rule, driven by whoever manages the rule set.
///
/// Only [`RuleState::Available`] rules are eligible for matching. States
/// this build does not recognise load as [`RuleState::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RuleState {
    #[default]
    Pending,
    Available,
    Unavailable,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Available => "Available",
            Self::Unavailable => "Unavailable",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Matcher {
    #[serde(default = "default_method", skip_serializing_if = "is_any_method")]
    pub method: String,

    /// Regular expression evaluated against the request path.
    pub path: String,
}

impl Matcher {
    #[must_use]
    pub fn accepts_method(&self, method: &str) -> bool {
        self.method == ANY_METHOD || self.method == method
    }
}

/// Where matched requests are sent. Exactly one of `url` and `service`
/// must be set; the validator enforces it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Upstream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceReference>,
}

impl Upstream {
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            service: None,
        }
    }

    /// The base URL this descriptor stands for, before any parsing.
    #[must_use]
    pub fn raw_url(&self) -> String {
        match (&self.url, &self.service) {
            (Some(url), _) => url.clone(),
            (None, Some(service)) => service.raw_url(),
            (None, None) => String::new(),
        }
    }
}

/// An in-cluster service addressed as `<name>.<namespace>.svc`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceReference {
    pub name: String,

    pub namespace: String,

    #[serde(
        default = "default_service_port",
        skip_serializing_if = "is_default_service_port"
    )]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ServiceReference {
    #[must_use]
    pub fn raw_url(&self) -> String {
        format!(
            "https://{}.{}.svc:{}{}",
            self.name,
            self.namespace,
            self.port,
            self.path.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_method_and_state() {
        let rule: RoutingRule = serde_json::from_str(
            r#"{"name": "a", "matcher": {"path": "^/a"}, "upstream": {"url": "http://a"}}"#,
        )
        .unwrap();
        assert_eq!(rule.state, RuleState::Pending);
        assert_eq!(rule.matcher.method, "*");
        assert!(!rule.is_available());
    }

    #[test]
    fn unrecognised_state_is_unknown() {
        let rule: RoutingRule = serde_json::from_str(
            r#"{"name": "a", "state": "Terminating", "matcher": {"path": "^/a"}, "upstream": {"url": "http://a"}}"#,
        )
        .unwrap();
        assert_eq!(rule.state, RuleState::Unknown);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<RoutingRule, _> = serde_json::from_str(
            r#"{"name": "a", "matcher": {"path": "^/a"}, "upstream": {"url": "http://a"}, "weight": 3}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn method_match_is_exact_and_case_sensitive() {
        let matcher = Matcher {
            method: "GET".into(),
            path: "^/".into(),
        };
        assert!(matcher.accepts_method("GET"));
        assert!(!matcher.accepts_method("get"));
        assert!(!matcher.accepts_method("POST"));

        let any = Matcher {
            method: "*".into(),
            path: "^/".into(),
        };
        assert!(any.accepts_method("PATCH"));
    }

    #[test]
    fn service_reference_builds_cluster_url() {
        let upstream = Upstream {
            url: None,
            service: Some(ServiceReference {
                name: "console".into(),
                namespace: "system".into(),
                port: 8443,
                path: Some("/ui".into()),
            }),
        };
        assert_eq!(upstream.raw_url(), "https://console.system.svc:8443/ui");
    }

    #[test]
    fn service_port_defaults_to_443() {
        let service: ServiceReference =
            serde_json::from_str(r#"{"name": "api", "namespace": "ext"}"#).unwrap();
        assert_eq!(service.raw_url(), "https://api.ext.svc:443");
    }

    #[test]
    fn explicit_url_wins_over_service() {
        let upstream = Upstream {
            url: Some("http://direct:80".into()),
            service: Some(ServiceReference {
                name: "x".into(),
                namespace: "y".into(),
                port: 443,
                path: None,
            }),
        };
        assert_eq!(upstream.raw_url(), "http://direct:80");
    }
}
