//! Mapping of HTTP outcomes onto the resilience error taxonomy.

use reqwest::StatusCode;
use resilience::{CallError, ErrorKind};
use serde::Deserialize;

/// Classifies an HTTP response status.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        400 | 422 => ErrorKind::Validation,
        401 | 403 => ErrorKind::Auth,
        404 => ErrorKind::NotFound,
        408 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimit,
        500..=599 => ErrorKind::Service,
        _ => ErrorKind::Client,
    }
}

/// Classifies a transport-level failure (no response received).
pub fn classify_reqwest_error(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_builder() || error.is_decode() {
        ErrorKind::Client
    } else {
        ErrorKind::Network
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Turns an error response into a classified [`CallError`], preferring the
/// server's own message when one is present.
pub async fn error_from_response(resp: reqwest::Response) -> CallError {
    let status = resp.status();
    let kind = classify_status(status);
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body
            .error
            .or(body.message)
            .unwrap_or_else(|| format!("request failed with status {status}")),
        Err(_) => format!("request failed with status {status}"),
    };
    CallError::new(kind, message)
}

/// Turns a transport failure into a classified [`CallError`].
pub fn error_from_transport(error: reqwest::Error) -> CallError {
    CallError::new(classify_reqwest_error(&error), error.to_string())
}
