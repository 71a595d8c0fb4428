//! First-match rule selection.
//!
//! [`select`] walks a rule snapshot in order and returns the first rule
//! that is `Available`, accepts the request method, and whose path
//! pattern matches. Overlapping rules are not ranked: whichever comes
//! first in the snapshot wins.
//!
//! Patterns are compiled per call. A pattern that fails to compile only
//! disqualifies its own rule.
//!
//! Patterns see the percent-decoded path (see [`decode_path`]), so
//! `^/docs/my file$` matches a request for `/docs/my%20file`.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::config::model::RoutingRule;
use crate::error::DetourError;

#[must_use]
pub fn select<'a>(method: &str, path: &str, rules: &'a [RoutingRule]) -> Option<&'a RoutingRule> {
    rules.iter().find(|rule| rule_matches(rule, method, path))
}

/// Percent-decodes a raw request path for classification and matching.
///
/// Decoded bytes that are not valid UTF-8 become U+FFFD rather than
/// failing the request; a pattern can still match the rest of the path.
/// Malformed escapes such as `%zz` are kept verbatim.
#[must_use]
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

fn rule_matches(rule: &RoutingRule, method: &str, path: &str) -> bool {
    if !rule.is_available() {
        return false;
    }

    if !rule.matcher.accepts_method(method) {
        return false;
    }

    match Regex::new(&rule.matcher.path) {
        Ok(pattern) => pattern.is_match(path),
        Err(source) => {
            let err = DetourError::Pattern {
                rule: rule.name.clone(),
                source,
            };
            tracing::warn!(rule = %rule.name, error = %err, "skipping rule with invalid path pattern");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Matcher, RuleState, Upstream};

    fn rule(name: &str, state: RuleState, method: &str, path: &str) -> RoutingRule {
        RoutingRule {
            name: name.into(),
            state,
            matcher: Matcher {
                method: method.into(),
                path: path.into(),
            },
            upstream: Upstream::url(format!("http://{name}:8080")),
        }
    }

    fn available(name: &str, method: &str, path: &str) -> RoutingRule {
        rule(name, RuleState::Available, method, path)
    }

    fn selected<'a>(method: &str, path: &str, rules: &'a [RoutingRule]) -> Option<&'a str> {
        select(method, path, rules).map(|r| r.name.as_str())
    }

    #[test]
    fn regex_path_match() {
        let rules = vec![available("foo", "*", "^/foo/.*")];
        assert_eq!(selected("GET", "/foo/bar", &rules), Some("foo"));
        assert_eq!(selected("GET", "/bar/foo", &rules), None);
    }

    #[test]
    fn first_match_wins() {
        let rules = vec![
            available("broad", "*", "^/api/"),
            available("narrow", "*", "^/api/users$"),
        ];
        assert_eq!(selected("GET", "/api/users", &rules), Some("broad"));
    }

    #[test]
    fn non_available_rules_never_match() {
        let rules = vec![
            rule("pending", RuleState::Pending, "*", "^/"),
            rule("down", RuleState::Unavailable, "*", "^/"),
            rule("odd", RuleState::Unknown, "*", "^/"),
        ];
        assert_eq!(selected("GET", "/anything", &rules), None);
    }

    #[test]
    fn skips_unavailable_and_continues() {
        let rules = vec![
            rule("down", RuleState::Unavailable, "*", "^/x"),
            available("up", "*", "^/x"),
        ];
        assert_eq!(selected("GET", "/x", &rules), Some("up"));
    }

    #[test]
    fn wildcard_method_matches_anything() {
        let rules = vec![available("any", "*", "^/")];
        for method in ["GET", "POST", "DELETE", "PROPFIND"] {
            assert_eq!(selected(method, "/", &rules), Some("any"));
        }
    }

    #[test]
    fn explicit_method_is_exact_and_case_sensitive() {
        let rules = vec![available("post", "POST", "^/orders$")];
        assert_eq!(selected("POST", "/orders", &rules), Some("post"));
        assert_eq!(selected("GET", "/orders", &rules), None);
        assert_eq!(selected("post", "/orders", &rules), None);
    }

    #[test]
    fn invalid_pattern_does_not_block_later_rules() {
        let rules = vec![available("broken", "*", "("), available("ok", "*", "^/ok$")];
        assert_eq!(selected("GET", "/ok", &rules), Some("ok"));
    }

    #[test]
    fn unanchored_pattern_matches_anywhere() {
        let rules = vec![available("sub", "*", "console")];
        assert_eq!(selected("GET", "/apps/console/index", &rules), Some("sub"));
    }

    #[test]
    fn empty_snapshot_selects_nothing() {
        assert!(select("GET", "/", &[]).is_none());
    }

    #[test]
    fn selection_is_deterministic() {
        let rules = vec![
            available("a", "GET", "^/a"),
            available("b", "*", "^/"),
            available("c", "*", "^/c"),
        ];
        let first = selected("GET", "/c/1", &rules);
        for _ in 0..10 {
            assert_eq!(selected("GET", "/c/1", &rules), first);
        }
        assert_eq!(first, Some("b"));
    }

    #[test]
    fn decode_path_unescapes_percent_sequences() {
        assert_eq!(decode_path("/docs/my%20file"), "/docs/my file");
        assert_eq!(decode_path("/%61pi/v1"), "/api/v1");
        assert!(matches!(decode_path("/plain/path"), Cow::Borrowed(_)));
    }

    #[test]
    fn decode_path_keeps_malformed_and_replaces_invalid_utf8() {
        assert_eq!(decode_path("/a%zz/b%"), "/a%zz/b%");
        assert_eq!(decode_path("/bin/%FF%FE"), "/bin/\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn invalid_utf8_path_still_matches_on_the_valid_part() {
        let rules = vec![available("bin", "*", "^/bin/")];
        let path = decode_path("/bin/%FF");
        assert_eq!(selected("GET", &path, &rules), Some("bin"));
    }
}
