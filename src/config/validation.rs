//! Rule file validation.
//!
//! [`validate`] reports structural problems that make a rule file unusable
//! (missing names, duplicates, ambiguous upstreams) and blocks loading.
//! [`lint`] reports problems confined to a single rule: a method token no
//! request can carry, a path pattern that does not compile, or an upstream
//! that does not resolve. Those never block loading, because the dispatcher
//! already skips or fails just the affected rule at request time.

use std::collections::HashSet;

use super::model::{RoutingRule, RuleSet, ANY_METHOD};
use crate::error::ValidationError;
use crate::proxy::upstream;

/// Validate an HTTP method token. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    if method == ANY_METHOD {
        return Ok(());
    }
    if method.is_empty() {
        return Err("method cannot be empty".into());
    }
    match http::Method::from_bytes(method.as_bytes()) {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{method}' is not a valid HTTP method")),
    }
}

pub fn validate(rules: &RuleSet) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, rule) in rules.rules.iter().enumerate() {
        let id = rule_id(i, rule);

        if rule.name.trim().is_empty() {
            errors.push(ValidationError {
                rule: id.clone(),
                field: "name".into(),
                message: "name cannot be empty".into(),
                suggestion: None,
            });
        } else if !seen.insert(rule.name.as_str()) {
            errors.push(ValidationError {
                rule: id.clone(),
                field: "name".into(),
                message: "duplicate rule name".into(),
                suggestion: None,
            });
        }

        match (&rule.upstream.url, &rule.upstream.service) {
            (Some(_), Some(_)) => errors.push(ValidationError {
                rule: id.clone(),
                field: "upstream".into(),
                message: "set either url or service, not both".into(),
                suggestion: None,
            }),
            (None, None) => errors.push(ValidationError {
                rule: id.clone(),
                field: "upstream".into(),
                message: "an upstream url or service is required".into(),
                suggestion: None,
            }),
            (None, Some(service)) => {
                if service.name.is_empty() {
                    errors.push(ValidationError {
                        rule: id.clone(),
                        field: "upstream.service.name".into(),
                        message: "service name cannot be empty".into(),
                        suggestion: None,
                    });
                }
                if service.namespace.is_empty() {
                    errors.push(ValidationError {
                        rule: id.clone(),
                        field: "upstream.service.namespace".into(),
                        message: "service namespace cannot be empty".into(),
                        suggestion: None,
                    });
                }
            }
            (Some(_), None) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Per-rule problems that the dispatcher tolerates at runtime.
#[must_use]
pub fn lint(rules: &RuleSet) -> Vec<ValidationError> {
    let mut warnings = Vec::new();

    for (i, rule) in rules.rules.iter().enumerate() {
        let id = rule_id(i, rule);

        let upper = rule.matcher.method.to_uppercase();
        if let Err(msg) = validate_method(&rule.matcher.method) {
            warnings.push(ValidationError {
                rule: id.clone(),
                field: "matcher.method".into(),
                message: msg,
                suggestion: Some("the rule will never match".into()),
            });
        } else if upper != rule.matcher.method {
            warnings.push(ValidationError {
                rule: id.clone(),
                field: "matcher.method".into(),
                message: format!(
                    "methods match case-sensitively, '{}' never matches '{upper}'",
                    rule.matcher.method
                ),
                suggestion: Some(format!("did you mean '{upper}'?")),
            });
        }

        if let Err(e) = regex::Regex::new(&rule.matcher.path) {
            warnings.push(ValidationError {
                rule: id.clone(),
                field: "matcher.path".into(),
                message: format!("pattern does not compile: {e}"),
                suggestion: Some("the rule will never match".into()),
            });
        } else if !rule.matcher.path.starts_with('^') {
            warnings.push(ValidationError {
                rule: id.clone(),
                field: "matcher.path".into(),
                message: "pattern is not anchored and matches anywhere in the path".into(),
                suggestion: Some(format!("did you mean '^{}'?", rule.matcher.path)),
            });
        }

        if rule.upstream.url.is_some() {
            if let Err(e) = upstream::resolve(rule) {
                warnings.push(ValidationError {
                    rule: id,
                    field: "upstream.url".into(),
                    message: e.to_string(),
                    suggestion: Some("matching requests will get an internal error".into()),
                });
            }
        }
    }

    warnings
}

/// Log every [`lint`] finding at WARN. Returns how many were logged.
pub fn warn_lint(rules: &RuleSet) -> usize {
    let warnings = lint(rules);
    for w in &warnings {
        tracing::warn!(
            rule = %w.rule,
            field = %w.field,
            suggestion = w.suggestion.as_deref().unwrap_or(""),
            "{}",
            w.message
        );
    }
    warnings.len()
}

fn rule_id(index: usize, rule: &RoutingRule) -> String {
    if rule.name.trim().is_empty() {
        format!("rules[{index}]")
    } else {
        rule.name.clone()
    }
}

#[must_use]
pub fn format_validation_report(path: &str, rules: &RuleSet) -> String {
    let mut lines = vec![format!(
        "  {} rules, {} available\n",
        rules.rules.len(),
        rules.available()
    )];

    for rule in &rules.rules {
        lines.push(format!(
            "  {} [{}]  {} {}  -> {}",
            rule.name,
            rule.state,
            rule.matcher.method,
            rule.matcher.path,
            rule.upstream.raw_url(),
        ));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
