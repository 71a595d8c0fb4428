//! `detour run`: start the dispatcher.
//!
//! Loads the rule file, builds the dispatcher around a live rule cache,
//! serves it as the router fallback, and keeps the cache fresh from a
//! background refresh loop until shutdown.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::cache::{refresh_loop, RuleCache};
use crate::config::sources::{self, AUTO_DETECT_CANDIDATES};
use crate::config::validation;
use crate::error::DetourError;
use crate::logging;
use crate::proxy::classify::PathPrefixClassifier;
use crate::proxy::forward::{build_http_client, UpgradeAwareForwarder};
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), DetourError> {
    logging::init(&args.log_level, logging::resolve_format(args.pretty, args.json));

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let path = resolve_rule_file(args.rules.as_deref()).await?;
    let loader = sources::loader_for_path(&path)?;
    let (rules, version) = loader.load().await?;

    let warnings = validation::warn_lint(&rules);
    let total = rules.rules.len();
    let available = rules.available();
    let cache = Arc::new(RuleCache::with_rules(loader.name(), rules, version));

    let classifier = Arc::new(PathPrefixClassifier::new(args.native_prefixes.clone()));
    let forwarder = Arc::new(UpgradeAwareForwarder::new(
        build_http_client(),
        Duration::from_millis(args.timeout),
    ));
    let state = Arc::new(AppState::new(cache.clone(), classifier.clone(), forwarder));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let refresh_handle = tokio::spawn(refresh_loop(
        cache,
        loader,
        Duration::from_secs(args.poll_interval),
        shutdown_rx,
    ));

    let router = server::build_router(state, args.max_body);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        rules_file = %path.display(),
        rules = total,
        available,
        warnings,
        native_prefixes = ?classifier.prefixes(),
        "detour started"
    );

    // Stop the refresh loop as soon as the signal arrives, not after drain.
    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown)
    .await?;

    if let Err(e) = refresh_handle.await {
        tracing::error!(error = %e, "rule refresh task failed");
    }

    tracing::info!("detour stopped");
    Ok(())
}

async fn resolve_rule_file(explicit: Option<&Path>) -> Result<PathBuf, DetourError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for name in AUTO_DETECT_CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected rule file");
            return Ok(path);
        }
    }

    Err(DetourError::NoRuleSource {
        hint: "Provide --rules <file> or create ./detour.yaml.\n  \
               Run 'detour init' to create a starter rule file."
            .into(),
    })
}
