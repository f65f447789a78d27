//! Error types for the mobile-operator API client.
//!
//! # Design
//! Failures come in two tiers. `ApiError` means the service answered with a
//! well-formed envelope whose `resultCode` is not `"OK"`; the vendor's
//! `code`, `message` and `payload` are carried verbatim so the caller can
//! decide whether to re-prompt (wrong SMS code), start a new session, or
//! give up. Everything else (the request never completed, or the body was
//! not a JSON envelope) is reported through the other `Error` variants and
//! never folded into `ApiError`.

use serde_json::Value;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A vendor-side rejection: the envelope's `resultCode` was not `"OK"`.
///
/// Renders as `"<code> (<message>)"`; absent parts render as empty strings.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "{} ({})",
    .code.as_deref().unwrap_or_default(),
    .message.as_deref().unwrap_or_default()
)]
pub struct ApiError {
    /// `None` when the envelope's `resultCode` was missing or `null`.
    pub result_code: Option<String>,
    /// Terse vendor identifier, e.g. `session.not.found`.
    pub code: Option<String>,
    /// The envelope's own `message` field, not a copy of `code`.
    pub message: Option<String>,
    /// Any structured detail the server attached to the failure.
    pub payload: Value,
}

/// The request could not be executed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, TLS, connection or body-read failure reported by ureq.
    #[error("HTTP transport failed: {0}")]
    Http(#[from] ureq::Error),

    /// I/O failure reported by a non-ureq transport.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by `MobileClient` operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body was not a JSON envelope.
    #[error("response body is not a valid envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// The vendor rejection, if this error is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}
