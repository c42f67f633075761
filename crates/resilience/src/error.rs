//! Uniform error taxonomy for network-calling operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed call.
///
/// The retryable kinds are exactly the transient ones: no response
/// received, explicit throttling, or a server-side failure. Caller
/// mistakes (validation, auth, missing resources, local bugs) are
/// surfaced immediately and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Missing, invalid, or expired credential.
    Auth,
    /// The referenced entity does not exist.
    NotFound,
    /// The request timed out without a response.
    Timeout,
    /// The request never reached the service.
    Network,
    /// The service answered with an explicit throttling response.
    RateLimit,
    /// The service answered with a 5xx / unavailable response.
    Service,
    /// A local or programming error on the calling side.
    Client,
}

impl ErrorKind {
    /// Returns true if an error of this kind is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Network | ErrorKind::RateLimit | ErrorKind::Service
        )
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Service => "service",
            ErrorKind::Client => "client",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified call failure.
#[derive(Debug, Clone, Error)]
#[error("{message} ({kind})")]
pub struct CallError {
    kind: ErrorKind,
    message: String,
    /// Label of the operation that produced the error, filled in by the
    /// retry wrapper.
    context: Option<String>,
}

impl CallError {
    /// Creates a classified error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Returns the same error annotated with an originating context label.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the originating context label, if set.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}
