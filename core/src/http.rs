//! HTTP request/response data and the transport seam.
//!
//! # Design
//! `MobileClient` builds `HttpRequest` values and parses `HttpResponse`
//! values as plain data. Executing the round trip is delegated to a
//! `Transport`, so tests can capture outgoing requests and replay canned
//! bodies without touching the network. `UreqTransport` is the blocking
//! implementation used in production.
//!
//! The vendor API only uses GET with form-encoded query parameters, so a
//! request is just a path plus an ordered list of pairs.

use tracing::debug;
use url::form_urlencoded;

use crate::error::TransportError;

/// A GET request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL without the query string.
    pub path: String,
    /// Query parameters in the order they are sent.
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    /// Value of the first query parameter named `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Full URL with the form-encoded query string appended.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// An HTTP response described as plain data.
///
/// The status is kept for diagnostics only; success is decided by the
/// envelope in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes a request and returns the raw response.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport over a single persistent `ureq::Agent`.
///
/// Non-2xx statuses are returned as data rather than errors, since the
/// service reports failures in the envelope.
///
/// Once the response has arrived, its content is left for the envelope
/// parser to judge: bytes that are not UTF-8 are replaced with U+FFFD, so a
/// garbled body surfaces as `Error::Decode`. Failures while the body is
/// still being received (connection reset, ureq's 10 MB body cap) remain
/// `TransportError::Http`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self.agent.get(&request.url()).call()?;
        let status = response.status().as_u16();
        let bytes = response.body_mut().read_to_vec()?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(path = %request.path, status, bytes = bytes.len(), "received response");
        Ok(HttpResponse { status, body })
    }
}
