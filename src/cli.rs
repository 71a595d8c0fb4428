//! Command-line interface definitions using clap derive macros.
//!
//! Every `run` flag has an environment variable equivalent for container
//! deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "detour",
    version,
    about = "Rule-driven HTTP dispatcher for requests the API server does not own",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        detour init                       Create a starter rule file\n  \
        detour run                        Start with ./detour.yaml\n  \
        detour run -r rules.yaml          Start with a specific rule file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dispatcher
    Run(Box<RunArgs>),

    /// Generate a starter rule file
    Init(InitArgs),

    /// Validate a rule file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        detour run                                     Auto-detect rule file\n  \
        detour run -r rules.yaml -p 8080 --pretty      Local dev mode\n  \
        detour run --native-prefix /api --native-prefix /oapi")]
pub struct RunArgs {
    /// Rule file path (.yaml, .yml, .json, .toml)
    #[arg(short, long, env = "DETOUR_RULES")]
    pub rules: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path prefix served natively and never dispatched (repeatable)
    #[arg(
        long = "native-prefix",
        env = "NATIVE_PREFIXES",
        value_delimiter = ',',
        default_values_t = [String::from("/api"), String::from("/apis")]
    )]
    pub native_prefixes: Vec<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,

    // -- Tuning --
    /// Milliseconds to wait for upstream response headers
    #[arg(
        long,
        env = "UPSTREAM_TIMEOUT_MS",
        default_value_t = 30_000,
        help_heading = "Tuning"
    )]
    pub timeout: u64,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 10 * 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Rule file change check interval in seconds
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..),
        help_heading = "Tuning"
    )]
    pub poll_interval: u64,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        detour init                            Starter rules (yaml)\n  \
        detour init -f toml -o rules.toml      TOML format, custom path")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: RuleFormat,

    /// Output file path (defaults to detour.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Rule file to validate
    #[arg(default_value = "detour.yaml")]
    pub rules: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RuleFormat {
    Yaml,
    Json,
    Toml,
}

impl RuleFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_defaults() {
        let args = run_args(&["detour", "run"]);
        assert_eq!(args.native_prefixes, vec!["/api", "/apis"]);
        assert_eq!(args.timeout, 30_000);
        assert_eq!(args.poll_interval, 10);
        assert!(args.rules.is_none());
    }

    #[test]
    fn native_prefixes_accept_commas_and_repeats() {
        let args = run_args(&["detour", "run", "--native-prefix", "/api,/oapi"]);
        assert_eq!(args.native_prefixes, vec!["/api", "/oapi"]);

        let args = run_args(&[
            "detour",
            "run",
            "--native-prefix",
            "/a",
            "--native-prefix",
            "/b",
        ]);
        assert_eq!(args.native_prefixes, vec!["/a", "/b"]);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(Cli::try_parse_from(["detour", "run", "--poll-interval", "0"]).is_err());
    }

    #[test]
    fn pretty_and_json_conflict() {
        assert!(Cli::try_parse_from(["detour", "run", "--pretty", "--json"]).is_err());
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["detour"]).unwrap();
        assert!(cli.command.is_none());
    }
}
