//! Request dispatcher for the automation server API.
//!
//! # Design
//! `Requester` owns an explicit `ClientConfig` and a shared [`Transport`].
//! Every public operation builds its own [`ApiRequest`], so concurrent calls
//! share nothing but read-only state.
//!
//! Mutating calls fetch a fresh CSRF crumb first. Crumb failures are logged
//! and dropped so servers without CSRF protection keep working; failures of
//! the main call are always returned. Each call is attempted exactly once.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::config::ClientConfig;
use crate::decode::{Destination, Json};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartBody, RequestBody, TransportResponse};
use crate::payload::{encode_upload, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, CONTENT_TYPE_XML};
use crate::request::{put_header, ApiRequest, Query};
use crate::transport::{ReqwestTransport, Transport};

/// Endpoint that hands out CSRF crumbs.
pub const CRUMB_ISSUER: &str = "/crumbIssuer";

/// Response header the server uses to report an error regardless of status.
pub const X_ERROR: &str = "X-Error";

const JSON_SUFFIX: &str = "api/json";

/// Result of a successful call: the buffered response plus the decoded value.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub response: HttpResponse,
    pub value: T,
}

/// Blocking client for one automation server.
#[derive(Clone)]
pub struct Requester {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Requester {
    /// Create a requester that talks HTTP through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base(&self) -> &str {
        &self.config.base_url
    }

    // -----------------------------------------------------------------------
    // Read-only operations
    // -----------------------------------------------------------------------

    pub fn get<D: Destination>(
        &self,
        endpoint: &str,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let ar = ApiRequest::new(HttpMethod::Get, endpoint, None);
        self.do_request(ar, dest, query, None)
    }

    /// GET `endpoint` + `api/json`.
    pub fn get_json<D: Destination>(
        &self,
        endpoint: &str,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let mut ar = ApiRequest::new(HttpMethod::Get, endpoint, None);
        ar.set_header("Content-Type", CONTENT_TYPE_JSON);
        ar.suffix = JSON_SUFFIX.to_string();
        self.do_request(ar, dest, query, None)
    }

    /// GET an XML document. The body is not parsed here; pass
    /// [`Text`](crate::decode::Text) and parse it at the call site.
    pub fn get_xml<D: Destination>(
        &self,
        endpoint: &str,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let mut ar = ApiRequest::new(HttpMethod::Get, endpoint, None);
        ar.set_header("Content-Type", CONTENT_TYPE_XML);
        self.do_request(ar, dest, query, None)
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    pub fn post<D: Destination>(
        &self,
        endpoint: &str,
        payload: Option<&[u8]>,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let mut ar = ApiRequest::new(HttpMethod::Post, endpoint, payload.map(<[u8]>::to_vec));
        self.set_crumb(&mut ar);
        ar.set_header("Content-Type", CONTENT_TYPE_FORM);
        self.do_request(ar, dest, query, None)
    }

    /// POST to `endpoint` + `api/json`.
    pub fn post_json<D: Destination>(
        &self,
        endpoint: &str,
        payload: Option<&[u8]>,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let mut ar = ApiRequest::new(HttpMethod::Post, endpoint, payload.map(<[u8]>::to_vec));
        self.set_crumb(&mut ar);
        ar.set_header("Content-Type", CONTENT_TYPE_FORM);
        ar.suffix = JSON_SUFFIX.to_string();
        self.do_request(ar, dest, query, None)
    }

    pub fn post_xml<D: Destination>(
        &self,
        endpoint: &str,
        xml: &str,
        dest: D,
        query: &Query,
    ) -> Result<Reply<D::Output>, ApiError> {
        let mut ar = ApiRequest::new(HttpMethod::Post, endpoint, Some(xml.as_bytes().to_vec()));
        self.set_crumb(&mut ar);
        ar.set_header("Content-Type", CONTENT_TYPE_XML);
        self.do_request(ar, dest, query, None)
    }

    /// POST a multipart form with one `file` part per path, followed by the
    /// string fields of the JSON object in `payload`.
    ///
    /// All files are read before any request is sent, so an unreadable path
    /// fails the call without touching the network.
    pub fn post_files<D: Destination, P: AsRef<Path>>(
        &self,
        endpoint: &str,
        payload: Option<&[u8]>,
        dest: D,
        query: &Query,
        files: &[P],
    ) -> Result<Reply<D::Output>, ApiError> {
        let upload = encode_upload(payload, files)?;
        let mut ar = ApiRequest::new(HttpMethod::Post, endpoint, payload.map(<[u8]>::to_vec));
        self.set_crumb(&mut ar);
        self.do_request(ar, dest, query, Some(upload))
    }

    /// Fetch a crumb and, when the issuer answers 200 with a field name, set
    /// it as a header on `ar`. Never fails: a missing or broken issuer just
    /// means no header is added.
    pub fn set_crumb(&self, ar: &mut ApiRequest) {
        let issuer = Json::<HashMap<String, String>>::new();
        let reply = match self.get_json(CRUMB_ISSUER, issuer, &Query::new()) {
            Ok(reply) => reply,
            Err(error) => {
                tracing::debug!(%error, "crumb issuer unavailable; sending without crumb");
                return;
            }
        };

        if reply.response.status != 200 {
            tracing::debug!(
                status = reply.response.status,
                "crumb issuer did not return 200; sending without crumb"
            );
            return;
        }

        match reply.value.get("crumbRequestField").filter(|field| !field.is_empty()) {
            Some(field) => {
                let crumb = reply.value.get("crumb").cloned().unwrap_or_default();
                tracing::debug!(%field, "applying crumb");
                ar.set_header(field.clone(), crumb);
            }
            None => tracing::debug!("crumb issuer returned no field name"),
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Resolve, send and classify one call, then decode the body into `dest`.
    ///
    /// With `upload` set the body is that multipart form; otherwise it is the
    /// descriptor's payload as raw bytes.
    pub fn do_request<D: Destination>(
        &self,
        mut ar: ApiRequest,
        dest: D,
        query: &Query,
        upload: Option<MultipartBody>,
    ) -> Result<Reply<D::Output>, ApiError> {
        if ar.method != HttpMethod::Post && !ar.endpoint.ends_with('/') {
            ar.endpoint.push('/');
        }
        let url = self.resolve_url(&ar, query)?;

        let multipart = upload.is_some();
        let body = match upload {
            Some(form) => RequestBody::Multipart(form),
            None => match ar.payload.take() {
                Some(bytes) => RequestBody::Bytes(bytes),
                None => RequestBody::Empty,
            },
        };

        let mut headers = Vec::new();
        self.apply_auth(&mut headers);
        for (key, value) in &ar.headers {
            // A multipart body gets its Content-Type from the form boundary.
            if multipart && key.eq_ignore_ascii_case("Content-Type") {
                continue;
            }
            put_header(&mut headers, key.clone(), value.clone());
        }

        let request = HttpRequest {
            method: ar.method,
            url,
            headers,
            body,
        };
        tracing::debug!(method = %request.method, url = %request.url, "dispatching request");

        let mut response = self.send(request)?;

        if let Some(text) = response.header(X_ERROR).filter(|t| !t.is_empty()) {
            tracing::warn!(error = %text, method = %ar.method, endpoint = %ar.endpoint, "server reported X-Error");
            return Err(ApiError::Server(text.to_string()));
        }

        let mut content = Vec::new();
        response.body.read_to_end(&mut content).map_err(|e| {
            tracing::warn!(error = %e, "failed to read response body");
            ApiError::BodyRead(e)
        })?;

        let response = HttpResponse {
            status: response.status,
            headers: response.headers,
            body: content,
        };

        if !response.is_success() {
            let body = response.text();
            tracing::warn!(status = response.status, %body, "request failed");
            return Err(ApiError::Status {
                status: response.status,
                body,
            });
        }

        let value = dest.decode(&response.body)?;
        Ok(Reply { response, value })
    }

    /// base + endpoint + suffix, with exactly one `/` between base and
    /// endpoint, plus the sorted query string.
    fn resolve_url(&self, ar: &ApiRequest, query: &Query) -> Result<String, ApiError> {
        let base = self.config.base_url.trim_end_matches('/');
        let separator = if ar.endpoint.starts_with('/') { "" } else { "/" };
        let raw = format!("{base}{separator}{}{}", ar.endpoint, ar.suffix);

        let mut url = Url::parse(&raw).map_err(|source| ApiError::Url { url: raw.clone(), source })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url.into())
    }

    fn apply_auth(&self, headers: &mut Vec<(String, String)>) {
        if let Some(auth) = &self.config.basic_auth {
            let token = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            put_header(headers, "Authorization".to_string(), format!("Basic {token}"));
        }
    }

    /// Execute `request`, following redirects with credentials re-attached.
    fn send(&self, mut request: HttpRequest) -> Result<TransportResponse, ApiError> {
        let mut hops = 0;
        loop {
            let response = self.transport.execute(&request)?;
            if !matches!(response.status, 301 | 302 | 303 | 307 | 308) {
                return Ok(response);
            }
            let Some(location) = response.header("Location").map(str::to_string) else {
                return Ok(response);
            };
            if hops == self.config.max_redirects {
                return Err(ApiError::TooManyRedirects(hops));
            }
            hops += 1;

            let next = Url::parse(&request.url)
                .and_then(|current| current.join(&location))
                .map_err(|source| ApiError::Url {
                    url: location.clone(),
                    source,
                })?;

            // 301/302/303 downgrade to a body-less GET; 307/308 replay as-is.
            if matches!(response.status, 301 | 302 | 303) && request.method != HttpMethod::Get {
                request.method = HttpMethod::Get;
                request.body = RequestBody::Empty;
                request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("Content-Type"));
            }
            drop(response);

            request.url = next.into();
            self.apply_auth(&mut request.headers);
            tracing::debug!(url = %request.url, hop = hops, "following redirect");
        }
    }
}
