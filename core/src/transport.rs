//! Wire-level execution of a resolved `HttpRequest`.
//!
//! # Design
//! `Transport` is the only place that performs network I/O. It sends exactly
//! one request and returns the response head with the body still unread; it
//! never follows redirects, retries or interprets status codes. Those rules
//! belong to the dispatcher so they behave the same with any transport.

use reqwest::blocking::{multipart, Client};
use reqwest::redirect::Policy;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, MultipartBody, RequestBody, TransportResponse};

/// Sends one HTTP request. Implementations must be safe to share between
/// threads; a `Requester` holds one behind an `Arc`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<TransportResponse, ApiError>;
}

/// Blocking transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!config.ssl_verify);

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                ApiError::Config(format!("failed to read CA certificate {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ApiError::Config(format!("invalid CA certificate {}: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<TransportResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            // The form picks its own boundary and sets Content-Type from it.
            RequestBody::Multipart(body) => builder.multipart(multipart_form(body)?),
        };

        let response = builder
            .send()
            .map_err(|e| ApiError::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        Ok(TransportResponse {
            status,
            headers,
            body: Box::new(response),
        })
    }
}

fn multipart_form(body: &MultipartBody) -> Result<multipart::Form, ApiError> {
    let mut form = multipart::Form::new();
    for file in &body.files {
        let part = multipart::Part::bytes(file.contents.clone())
            .file_name(file.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| ApiError::Transport(Box::new(e)))?;
        form = form.part("file", part);
    }
    for (key, value) in &body.fields {
        form = form.text(key.clone(), value.clone());
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_cert_is_config_error() {
        let config = ClientConfig::new("http://ci.example").with_ca_cert("/nonexistent/ca.pem");
        let err = ReqwestTransport::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn builds_with_verification_disabled() {
        let config = ClientConfig::new("https://ci.example").with_ssl_verify(false);
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
