//! `GET /healthz` endpoint handler.
//!
//! Reports the build, uptime, the rule snapshot currently served by the
//! cache, and dispatch counters. The route is native, so the dispatcher
//! never sees it.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub rules: RulesHealth,
    pub stats: StatsResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RulesHealth {
    pub source: String,
    /// Short content hash, absent until the first successful load.
    pub version: Option<String>,
    pub loaded_ago_seconds: Option<u64>,
    pub reloads: u64,
    pub total: usize,
    pub available: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Forwarded plus failed.
    pub requests_claimed: u64,
    pub requests_forwarded: u64,
    pub requests_unclaimed: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.rules.status().await;
    let stats = state.dispatcher.stats();

    // A never-synced cache still answers; the dispatcher is what fails.
    let status = if cache.version.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("DETOUR_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        rules: RulesHealth {
            source: cache.source.to_string(),
            version: cache.version,
            loaded_ago_seconds: cache.loaded_ago_seconds,
            reloads: cache.reloads,
            total: cache.total,
            available: cache.available,
        },
        stats: StatsResponse {
            requests_claimed: stats.claimed(),
            requests_forwarded: stats.forwarded.load(Ordering::Relaxed),
            requests_unclaimed: stats.unclaimed.load(Ordering::Relaxed),
            requests_failed: stats.failed.load(Ordering::Relaxed),
        },
    })
}
