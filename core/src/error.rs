//! Error types for the request layer.
//!
//! # Design
//! One variant per way a call can fail. Nothing here is retried: every
//! variant is handed straight back to the caller. `Status` and `Decode` keep
//! the buffered body so the caller can log what the server actually sent.
//! Crumb failures never show up here because the crumb step swallows them.

use std::path::PathBuf;

/// Boxed error produced by a [`Transport`](crate::transport::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `Requester` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Base URL, endpoint and suffix did not resolve to a valid URL.
    #[error("invalid url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The server set a non-empty `X-Error` header.
    #[error("server error: {0}")]
    Server(String),

    /// The server returned a status outside `200..300`.
    #[error("response status code is not 2xx: {status}")]
    Status { status: u16, body: String },

    /// The response body could not be read to the end.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] std::io::Error),

    /// The response body did not fit the requested JSON shape.
    #[error("failed to decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// A text destination was requested but the body is not UTF-8.
    #[error("response body is not valid UTF-8 text")]
    NotText(#[source] std::string::FromUtf8Error),

    /// An upload file could not be opened or read.
    #[error("failed to read upload file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The redirect chain was longer than the configured limit.
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    /// An XML body handed to a collaborator could not be parsed.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The client could not be constructed from its configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status carried by a `Status` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
