//! `detour init`: write a starter rule file.
//!
//! The starter set is built as a [`RuleSet`] and serialized, so every
//! format round-trips through the same loader `detour run` uses.

use std::path::PathBuf;

use crate::cli::{InitArgs, RuleFormat};
use crate::config::model::{Matcher, RoutingRule, RuleSet, RuleState, ServiceReference, Upstream};
use crate::error::DetourError;

const HEADER: &str = "Rules are tried in order; the first Available rule whose method and\n\
                      path pattern match wins. Paths are matched as regular expressions.";

pub fn execute(args: &InitArgs) -> Result<(), DetourError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("detour.{}", args.format.extension())));

    if output.exists() {
        return Err(DetourError::FileExists { path: output });
    }

    let content = render(&starter_rules(), args.format)?;
    std::fs::write(&output, content)?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub fn starter_rules() -> RuleSet {
    RuleSet {
        rules: vec![
            RoutingRule {
                name: "console".into(),
                state: RuleState::Available,
                matcher: Matcher {
                    method: "GET".into(),
                    path: "^/console(/|$)".into(),
                },
                upstream: Upstream::url("http://localhost:8080"),
            },
            RoutingRule {
                name: "metrics".into(),
                state: RuleState::Pending,
                matcher: Matcher {
                    method: "*".into(),
                    path: "^/metrics/".into(),
                },
                upstream: Upstream {
                    url: None,
                    service: Some(ServiceReference {
                        name: "metrics-gateway".into(),
                        namespace: "monitoring".into(),
                        port: 8443,
                        path: None,
                    }),
                },
            },
        ],
    }
}

pub fn render(rules: &RuleSet, format: RuleFormat) -> Result<String, DetourError> {
    match format {
        #[cfg(feature = "yaml")]
        RuleFormat::Yaml => serde_yml::to_string(rules)
            .map(|body| format!("{}\n{body}", comment_block(HEADER)))
            .map_err(to_io),

        #[cfg(not(feature = "yaml"))]
        RuleFormat::Yaml => Err(DetourError::UnsupportedFormat("yaml".into())),

        RuleFormat::Json => serde_json::to_string_pretty(rules)
            .map(|body| body + "\n")
            .map_err(to_io),

        #[cfg(feature = "toml")]
        RuleFormat::Toml => toml::to_string_pretty(rules)
            .map(|body| format!("{}\n{body}", comment_block(HEADER)))
            .map_err(to_io),

        #[cfg(not(feature = "toml"))]
        RuleFormat::Toml => Err(DetourError::UnsupportedFormat("toml".into())),
    }
}

fn to_io(e: impl std::fmt::Display) -> DetourError {
    DetourError::Io(std::io::Error::other(e.to_string()))
}

fn comment_block(text: &str) -> String {
    text.lines().map(|line| format!("# {line}\n")).collect()
}
