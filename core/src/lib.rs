//! Blocking request layer for an automation server's REST/XML API.
//!
//! # Overview
//! Builds an outgoing request from a method, endpoint, payload and headers,
//! attaches a CSRF crumb to mutating calls, encodes form, XML or multipart
//! payloads, sends the request once and decodes the buffered response into
//! discarded, text or typed JSON output.
//!
//! # Design
//! - `Requester` holds an explicit `ClientConfig` plus a shared `Transport`;
//!   there is no global client state.
//! - Dispatch rules (URL resolution, auth, redirects, `X-Error`, status
//!   classification) live in the requester. The transport only moves bytes,
//!   so tests can swap in a fake.
//! - The decode strategy is chosen by the caller through a `Destination`.
//! - Resource wrappers such as `Credentials` only pick endpoints and payloads.

pub mod config;
pub mod credentials;
pub mod decode;
pub mod error;
pub mod http;
pub mod payload;
pub mod request;
pub mod requester;
pub mod transport;
pub mod types;

pub use config::{BasicAuth, ClientConfig};
pub use credentials::Credentials;
pub use decode::{Destination, Discard, Json, Text};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, TransportResponse};
pub use request::{ApiRequest, Query};
pub use requester::{Reply, Requester};
pub use transport::{ReqwestTransport, Transport};
pub use types::{DomainWrapper, UserCredential};
