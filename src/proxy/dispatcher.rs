//! Per-request orchestration: classify, match, resolve, rewrite, forward.
//!
//! [`Dispatcher::dispatch`] either claims a request (a response has been
//! produced, successful or not) or hands it back unclaimed and untouched so
//! the host server can run its next handler. Once any error response has
//! been produced the request stays claimed; nothing falls back to other
//! handlers after a rule has matched.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request};
use axum::response::Response;

use super::classify::RequestClassifier;
use super::forward::Forwarder;
use super::headers::{self, ForwardContext, REQUEST_ID};
use super::{matcher, status, upstream};
use crate::config::RuleSource;
use crate::error::DetourError;

/// Outcome of one dispatch.
pub enum Dispatch {
    Claimed(Response),
    Unclaimed(Request<Body>),
}

impl Dispatch {
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

/// Request counters. A claimed request either reached the forwarder's
/// response (`forwarded`) or was answered with an error status (`failed`).
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub forwarded: AtomicU64,
    pub unclaimed: AtomicU64,
    pub failed: AtomicU64,
}

impl DispatchStats {
    #[must_use]
    pub fn claimed(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }
}

pub struct Dispatcher {
    rules: Arc<dyn RuleSource>,
    classifier: Arc<dyn RequestClassifier>,
    forwarder: Arc<dyn Forwarder>,
    stats: DispatchStats,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        rules: Arc<dyn RuleSource>,
        classifier: Arc<dyn RequestClassifier>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            rules,
            classifier,
            forwarder,
            stats: DispatchStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub async fn dispatch(&self, mut req: Request<Body>) -> Dispatch {
        // Classification and matching see the decoded path; the upstream
        // URI is built from the raw one so forwarded bytes are unchanged.
        let path = matcher::decode_path(req.uri().path()).into_owned();

        if self.classifier.is_native(&req, &path) {
            return self.unclaimed(req);
        }

        let rules = match self.rules.list().await {
            Ok(rules) => rules,
            Err(e) => return self.fail(&e),
        };

        let method = req.method().as_str().to_owned();

        let Some(rule) = matcher::select(&method, &path, &rules) else {
            tracing::debug!(method = %method, path = %path, rules = rules.len(), "no rule matched");
            return self.unclaimed(req);
        };

        let location = match upstream::resolve(rule).and_then(|target| {
            target
                .locate(req.uri())
                .map(|uri| (target, uri))
                .map_err(|e| DetourError::UpstreamResolution {
                    rule: rule.name.clone(),
                    raw: rule.upstream.raw_url(),
                    reason: e.to_string(),
                })
        }) {
            Ok(location) => location,
            Err(e) => return self.fail(&e),
        };
        let (target, uri) = location;

        let request_id = req
            .headers()
            .get(REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let original_scheme = req.uri().scheme_str().unwrap_or("http").to_owned();

        headers::prepare_request_headers(
            req.headers_mut(),
            &ForwardContext {
                client_ip,
                original_scheme: &original_scheme,
                upstream: &target.authority,
                request_id: &request_id,
            },
        );

        tracing::info!(
            request_id = %request_id,
            rule = %rule.name,
            method = %method,
            path = %path,
            upstream = %uri,
            "forwarding request"
        );
        *req.uri_mut() = uri;

        match self.forwarder.forward(req).await {
            Ok(mut response) => {
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                if let Ok(val) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(REQUEST_ID, val);
                }
                Dispatch::Claimed(response)
            }
            Err(e) => self.fail(&e),
        }
    }

    fn unclaimed(&self, req: Request<Body>) -> Dispatch {
        self.stats.unclaimed.fetch_add(1, Ordering::Relaxed);
        Dispatch::Unclaimed(req)
    }

    fn fail(&self, err: &DetourError) -> Dispatch {
        tracing::error!(error = %err, "dispatch failed");
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        Dispatch::Claimed(status::internal_error(err))
    }
}
