//! Detour is a rule-driven HTTP dispatcher that sits behind an API server.
//!
//! Requests the host server does not own natively are matched against an
//! ordered list of routing rules. The first available rule whose method
//! and path pattern match claims the request, which is then rewritten and
//! relayed to the rule's upstream, protocol upgrades included. Requests no
//! rule claims fall through to the host's own not-found handling.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Rule model, loading, validation, and the hot-reloaded
//!   [`RuleCache`](config::cache::RuleCache).
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /healthz` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- The dispatcher: classification, rule selection, upstream
//!   resolution, proxy headers, and upgrade-aware forwarding.
//! - [`server`] -- Axum router, shared application state, and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML rule file support _(enabled by default)_ |
//! | `json` | JSON rule file support |
//! | `toml` | TOML rule file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `file-backends` | All rule file formats |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
