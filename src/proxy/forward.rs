//! Forwarding primitive: relays a rewritten request to its upstream.
//!
//! [`UpgradeAwareForwarder`] streams request and response bodies through a
//! pooled hyper client without buffering. When the client asked for a
//! protocol upgrade and the upstream answers `101 Switching Protocols`, both
//! connections are upgraded and bytes are copied in each direction on a
//! detached task until either side closes.
//!
//! Errors before the upstream's response head arrives are returned to the
//! caller. Once headers have been relayed, body errors can only be logged.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use hyper::upgrade::OnUpgrade;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};

use super::headers;
use crate::error::DetourError;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Body>;

#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Send `req` (already carrying the upstream URI) and return the response
    /// to relay to the client.
    async fn forward(&self, req: Request<Body>) -> Result<Response, DetourError>;
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // Several rustls providers may be compiled in; pick ring explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub struct UpgradeAwareForwarder {
    client: HttpClient,
    response_timeout: Duration,
}

impl UpgradeAwareForwarder {
    /// `response_timeout` bounds the wait for the upstream's response head,
    /// not the lifetime of the exchange.
    #[must_use]
    pub fn new(client: HttpClient, response_timeout: Duration) -> Self {
        Self {
            client,
            response_timeout,
        }
    }
}

#[async_trait]
impl Forwarder for UpgradeAwareForwarder {
    async fn forward(&self, mut req: Request<Body>) -> Result<Response, DetourError> {
        let target = req.uri().to_string();
        let client_upgrade =
            headers::is_upgrade_request(req.headers()).then(|| hyper::upgrade::on(&mut req));

        let response = tokio::time::timeout(self.response_timeout, self.client.request(req))
            .await
            .map_err(|_| DetourError::Forwarding {
                target: target.clone(),
                source: format!(
                    "no response within {}ms",
                    self.response_timeout.as_millis()
                )
                .into(),
            })?
            .map_err(|e| DetourError::Forwarding {
                target: target.clone(),
                source: Box::new(e),
            })?;

        if response.status() == StatusCode::SWITCHING_PROTOCOLS {
            let Some(client_upgrade) = client_upgrade else {
                return Err(DetourError::Forwarding {
                    target,
                    source: "upstream switched protocols without an upgrade request".into(),
                });
            };
            let mut response = response;
            let upstream_upgrade = hyper::upgrade::on(&mut response);
            let (parts, _) = response.into_parts();

            tracing::debug!(upstream = %target, "upstream accepted protocol upgrade");
            tokio::spawn(tunnel(client_upgrade, upstream_upgrade, target));

            return Ok(Response::from_parts(parts, Body::empty()));
        }

        let (mut parts, body) = response.into_parts();
        headers::strip_response_hop_by_hop(&mut parts.headers);

        let body = body.map_err(move |e| {
            tracing::warn!(
                upstream = %target,
                error = %e,
                "upstream body failed after response headers were sent"
            );
            e
        });

        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

async fn tunnel(client: OnUpgrade, upstream: OnUpgrade, target: String) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(upstream = %target, error = %e, "protocol upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);

    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(upstream = %target, sent, received, "upgraded connection closed");
        }
        Err(e) => {
            tracing::debug!(upstream = %target, error = %e, "upgraded connection ended with error");
        }
    }
}
