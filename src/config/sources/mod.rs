//! Concrete [`RuleLoader`](super::RuleLoader) implementations.
//!
//! Rule files come in YAML, JSON, or TOML, each behind its own feature
//! flag. [`parse_rules_str`] picks the deserializer from a file extension
//! and [`loader_for_path`] builds the matching file-backed loader.

pub mod file_source;

#[cfg(feature = "yaml")]
pub mod yaml;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "toml")]
pub mod toml_source;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::model::RuleSet;
use crate::config::RuleLoader;
use crate::error::DetourError;

/// File names probed, in order, when no rule file is given.
pub const AUTO_DETECT_CANDIDATES: &[&str] =
    &["detour.yaml", "detour.yml", "detour.json", "detour.toml"];

/// Parse a rule file body based on its extension.
pub fn parse_rules_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<RuleSet, DetourError> {
    let parsed: Result<RuleSet, Box<dyn std::error::Error + Send + Sync>> = match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(Into::into),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(Into::into),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(Into::into),

        other => return Err(DetourError::UnsupportedFormat(other.to_string())),
    };

    parsed.map_err(|source| DetourError::RuleParse {
        path: path_display.to_string(),
        source,
    })
}

/// Lowercase hex-encoded SHA-256 digest, used as the rule version.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Build a file-backed loader for `path`, chosen by extension.
pub fn loader_for_path(path: &Path) -> Result<Box<dyn RuleLoader>, DetourError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Box::new(yaml::new(path.to_path_buf()))),

        #[cfg(feature = "json")]
        "json" => Ok(Box::new(json::new(path.to_path_buf()))),

        #[cfg(feature = "toml")]
        "toml" => Ok(Box::new(toml_source::new(path.to_path_buf()))),

        other => Err(DetourError::UnsupportedFormat(other.to_string())),
    }
}
