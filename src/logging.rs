//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.
//!
//! Connection-level chatter from `hyper_util` and `rustls` is capped at
//! WARN unless the requested level is TRACE.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

const NOISY_TARGETS: &[&str] = &["hyper_util", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[must_use]
pub fn filter_for(level: Level) -> Targets {
    let dependency_level = if level == Level::TRACE {
        level
    } else {
        level.min(Level::WARN)
    };

    NOISY_TARGETS.iter().fold(
        Targets::new().with_default(level),
        |targets, target| targets.with_target(*target, dependency_level),
    )
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter_for(level.to_tracing_level()));

    // Without an initialised Sentry client the layer is inert.
    #[cfg(feature = "sentry-integration")]
    let registry = registry.with(sentry_tracing::layer());

    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty()).init();
        }
    }
}
