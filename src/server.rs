//! Axum server setup, shared application state, and graceful shutdown.
//!
//! [`AppState`] bundles the dispatcher with the rule cache it reads from.
//! [`build_router`] mounts the native `/healthz` route and installs the
//! dispatcher as the fallback for everything else.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::cache::RuleCache;
use crate::health::health_handler;
use crate::proxy;
use crate::proxy::classify::RequestClassifier;
use crate::proxy::dispatcher::Dispatcher;
use crate::proxy::forward::Forwarder;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub rules: Arc<RuleCache>,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        rules: Arc<RuleCache>,
        classifier: Arc<dyn RequestClassifier>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(rules.clone(), classifier, forwarder),
            rules,
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .fallback(proxy::dispatch_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
