//! Structured error responses written by the dispatcher.
//!
//! Bodies follow the API server's status object shape so clients that
//! already parse native API failures can read these too.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DetourError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub kind: String,
    pub status: String,
    pub message: String,
    pub reason: String,
    pub code: u16,
}

impl Status {
    #[must_use]
    pub fn failure(code: StatusCode, reason: &str, message: impl Into<String>) -> Self {
        Self {
            kind: "Status".into(),
            status: "Failure".into(),
            message: message.into(),
            reason: reason.into(),
            code: code.as_u16(),
        }
    }
}

impl IntoResponse for Status {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (code, Json(self)).into_response();
        response
            .headers_mut()
            .insert("x-content-type-options", HeaderValue::from_static("nosniff"));
        response
    }
}

/// 500 response carrying the error detail.
#[must_use]
pub fn internal_error(err: &DetourError) -> Response {
    Status::failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError",
        format!("Internal error occurred: {err}"),
    )
    .into_response()
}

/// 404 for requests neither the host server nor any rule claimed.
#[must_use]
pub fn not_found(path: &str) -> Response {
    Status::failure(
        StatusCode::NOT_FOUND,
        "NotFound",
        format!("the server could not find the requested resource: {path}"),
    )
    .into_response()
}
