//! Integration tests for rule selection and upstream rewriting.

use axum::http::Uri;

use detour::config::model::{Matcher, RoutingRule, RuleState, ServiceReference, Upstream};
use detour::proxy::matcher::select;
use detour::proxy::upstream::resolve;

fn make_rule(name: &str, method: &str, path: &str) -> RoutingRule {
    RoutingRule {
        name: name.into(),
        state: RuleState::Available,
        matcher: Matcher {
            method: method.into(),
            path: path.into(),
        },
        upstream: Upstream::url(format!("http://{name}:8080")),
    }
}

fn selected<'a>(rules: &'a [RoutingRule], method: &str, path: &str) -> Option<&'a str> {
    select(method, path, rules).map(|r| r.name.as_str())
}

#[test]
fn declaration_order_beats_specificity() {
    let rules = vec![
        make_rule("catch-all", "*", "^/"),
        make_rule("users", "*", "^/users/me$"),
    ];

    // No specificity ranking: the broad rule listed first wins.
    assert_eq!(selected(&rules, "GET", "/users/me"), Some("catch-all"));
}

#[test]
fn method_filtering_restricts_matches() {
    let rules = vec![
        make_rule("reader", "GET", "^/orders"),
        make_rule("writer", "POST", "^/orders"),
    ];

    assert_eq!(selected(&rules, "GET", "/orders"), Some("reader"));
    assert_eq!(selected(&rules, "POST", "/orders"), Some("writer"));
    assert_eq!(selected(&rules, "DELETE", "/orders"), None);
}

#[test]
fn only_available_rules_take_part() {
    let mut states = Vec::new();
    for (name, state) in [
        ("pending", RuleState::Pending),
        ("unavailable", RuleState::Unavailable),
        ("unknown", RuleState::Unknown),
        ("live", RuleState::Available),
    ] {
        let mut rule = make_rule(name, "*", "^/x");
        rule.state = state;
        states.push(rule);
    }

    assert_eq!(selected(&states, "GET", "/x"), Some("live"));
    assert_eq!(selected(&states[..3], "GET", "/x"), None);
}

#[test]
fn patterns_are_unanchored_unless_written_anchored() {
    let rules = vec![make_rule("loose", "*", "metrics")];
    assert_eq!(selected(&rules, "GET", "/apps/metrics/cpu"), Some("loose"));

    let rules = vec![make_rule("strict", "*", "^/metrics$")];
    assert_eq!(selected(&rules, "GET", "/apps/metrics"), None);
    assert_eq!(selected(&rules, "GET", "/metrics"), Some("strict"));
}

#[test]
fn query_string_is_not_part_of_the_match() {
    let rules = vec![make_rule("search", "GET", "^/search$")];
    let uri: Uri = "/search?q=term".parse().unwrap();
    assert_eq!(selected(&rules, "GET", uri.path()), Some("search"));
}

#[test]
fn invalid_pattern_never_blocks_later_rules() {
    let rules = vec![
        make_rule("broken", "*", "[a-"),
        make_rule("also-broken", "*", "(?P<"),
        make_rule("fine", "*", "^/"),
    ];
    for _ in 0..3 {
        assert_eq!(selected(&rules, "GET", "/anything"), Some("fine"));
    }
}

#[test]
fn empty_rule_list_selects_nothing() {
    assert!(select("GET", "/", &[]).is_none());
}

#[test]
fn rewrite_keeps_path_and_query_under_the_prefix() {
    let mut rule = make_rule("a", "*", "^/foo");
    rule.upstream = Upstream::url("http://svc-a:8080/base");

    let target = resolve(&rule).unwrap();
    let uri = target
        .locate(&"/foo/bar?x=1&y=two".parse().unwrap())
        .unwrap();
    assert_eq!(uri.to_string(), "http://svc-a:8080/base/foo/bar?x=1&y=two");
}

#[test]
fn service_reference_resolves_to_cluster_dns() {
    let mut rule = make_rule("svc", "*", "^/");
    rule.upstream = Upstream {
        url: None,
        service: Some(ServiceReference {
            name: "gateway".into(),
            namespace: "edge".into(),
            port: 9443,
            path: Some("/v2".into()),
        }),
    };

    let target = resolve(&rule).unwrap();
    let uri = target.locate(&"/items".parse().unwrap()).unwrap();
    assert_eq!(uri.to_string(), "https://gateway.edge.svc:9443/v2/items");
}

#[test]
fn unsupported_upstream_scheme_is_rejected() {
    let mut rule = make_rule("ftp", "*", "^/");
    rule.upstream = Upstream::url("ftp://files.example.com");
    assert!(resolve(&rule).is_err());

    rule.upstream = Upstream::url("not a url");
    assert!(resolve(&rule).is_err());
}
