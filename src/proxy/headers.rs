//! Proxy header handling for forwarded requests and relayed responses.
//!
//! [`prepare_request_headers`] strips hop-by-hop headers (keeping the
//! `Connection: upgrade` / `Upgrade` pair on upgrade requests), points
//! `Host` at the upstream, and records the client in `X-Forwarded-*`.
//! Everything else the client sent goes through untouched.

use std::net::IpAddr;
use std::sync::LazyLock;

use axum::http::header::{CONNECTION, HOST, UPGRADE};
use axum::http::uri::Authority;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const REQUEST_ID: &str = "x-request-id";

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "proxy-connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// What the forwarded request needs to know about its origin and destination.
#[derive(Debug)]
pub struct ForwardContext<'a> {
    pub client_ip: Option<IpAddr>,
    pub original_scheme: &'a str,
    pub upstream: &'a Authority,
    pub request_id: &'a str,
}

/// `true` when the client asked to switch protocols (`Connection: upgrade`
/// plus an `Upgrade` header).
#[must_use]
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(UPGRADE) && connection_tokens(headers).any(|t| t == "upgrade")
}

fn connection_tokens(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
}

/// Remove hop-by-hop headers, including any the sender listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = connection_tokens(headers)
        .filter_map(|t| t.parse::<HeaderName>().ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

pub fn prepare_request_headers(headers: &mut HeaderMap, ctx: &ForwardContext<'_>) {
    let upgrade = is_upgrade_request(headers)
        .then(|| headers.get(UPGRADE).cloned())
        .flatten();
    let original_host = headers.get(HOST).cloned();

    strip_hop_by_hop(headers);

    if let Some(protocol) = upgrade {
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(UPGRADE, protocol);
    }

    if let Ok(host) = HeaderValue::from_str(ctx.upstream.as_str()) {
        headers.insert(HOST, host);
    }

    if let Some(ip) = ctx.client_ip {
        let xff = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| ip.to_string(), |existing| format!("{existing}, {ip}"));
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }
    }

    if !headers.contains_key("x-forwarded-proto") {
        if let Ok(val) = HeaderValue::from_str(ctx.original_scheme) {
            headers.insert("x-forwarded-proto", val);
        }
    }

    if let Some(host) = original_host {
        if !headers.contains_key("x-forwarded-host") {
            headers.insert("x-forwarded-host", host);
        }
    }

    if let Ok(val) = HeaderValue::from_str(ctx.request_id) {
        headers.insert(REQUEST_ID, val);
    }
}

/// Strip hop-by-hop headers from a relayed (non-101) upstream response.
///
/// The body is streamed through unchanged, so `content-length` stays.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
}
