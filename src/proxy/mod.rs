//! Rule-driven request dispatch to external upstreams.
//!
//! [`dispatch_handler`] is the Axum fallback: every request that no native
//! route claimed goes through the [`Dispatcher`](dispatcher::Dispatcher).
//! Submodules cover rule selection ([`matcher`]), upstream resolution and
//! target rewriting ([`upstream`]), native-request classification
//! ([`classify`]), proxy headers ([`headers`]), the forwarding primitive
//! ([`forward`]), and error bodies ([`status`]).

pub mod classify;
pub mod dispatcher;
pub mod forward;
pub mod headers;
pub mod matcher;
pub mod status;
pub mod upstream;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;

use crate::server::AppState;
use dispatcher::Dispatch;

pub async fn dispatch_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    match state.dispatcher.dispatch(req).await {
        Dispatch::Claimed(response) => response,
        Dispatch::Unclaimed(req) => fall_through(req),
    }
}

/// Handler that runs after the dispatcher declines a request.
fn fall_through(req: Request<Body>) -> Response {
    tracing::debug!(method = %req.method(), path = %req.uri().path(), "request not claimed");
    status::not_found(req.uri().path())
}
