//! Blocking client for the Tinkoff Mobile (MVNO) web API.
//!
//! # Overview
//! Every endpoint is a GET with form-encoded query parameters and answers
//! with the same JSON envelope: `resultCode` is `"OK"` and `payload` holds
//! the data, or `resultCode` is something else and `code`/`message`
//! describe the rejection. The workflow is linear: open a session, sign up
//! by phone, confirm the SMS code, then query account data.
//!
//! # Design
//! - `MobileClient` keeps the session and confirmation identifiers between
//!   calls and never validates call order.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), with a `Transport` executing
//!   the round trip in between. `UreqTransport` is the default.
//! - Payloads are returned as `serde_json::Value`; their shape is
//!   endpoint-specific and not interpreted here.
//! - `Error::Api` is a vendor rejection; `Error::Transport` and
//!   `Error::Decode` mean the service could not be reached or understood.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod http;

pub use client::MobileClient;
pub use config::ClientConfig;
pub use endpoint::Endpoint;
pub use envelope::Envelope;
pub use error::{ApiError, Error, Result, TransportError};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
