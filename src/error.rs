//! Unified error types for detour.
//!
//! [`DetourError`] covers every failure the binary can hit: rule loading,
//! the per-request dispatch taxonomy (rule source, pattern, upstream
//! resolution, forwarding), and the CLI helpers. [`ValidationError`]
//! describes a single problem found in a rule file.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub rule: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  rule {}: {}: {}", self.rule, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DetourError {
    #[error("No rule source found.\n\n  {hint}")]
    NoRuleSource { hint: String },

    #[error("Rule file not found: {}", path.display())]
    RuleFileNotFound { path: PathBuf },

    #[error("Rule parse error in {path}:\n  {source}")]
    RuleParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Rule validation failed:\n{}", format_errors(.errors))]
    RuleValidation { errors: Vec<ValidationError> },

    #[error("Unsupported rule file format: '{0}'")]
    UnsupportedFormat(String),

    /// The rule snapshot could not be fetched.
    #[error("failed to list routing rules from {source_name}: {message}")]
    RuleSource {
        source_name: &'static str,
        message: String,
    },

    /// A rule's path pattern does not compile. Recovered by skipping the rule.
    #[error("rule {rule}: invalid path pattern: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule {rule}: invalid upstream '{raw}': {reason}")]
    UpstreamResolution {
        rule: String,
        raw: String,
        reason: String,
    },

    #[error("forwarding to {target} failed: {source}")]
    Forwarding {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}
