//! Request descriptor: one logical call before it is dispatched.

use std::collections::BTreeMap;

use crate::http::HttpMethod;

/// Query parameters. A `BTreeMap` so the encoded query string is sorted.
pub type Query = BTreeMap<String, String>;

/// Describes one pending call. Created per call and dropped after dispatch;
/// only headers change after construction.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub payload: Option<Vec<u8>>,
    /// Insertion ordered; keys compare case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Appended to the endpoint before the query string, e.g. `api/json`.
    pub suffix: String,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>, payload: Option<Vec<u8>>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            payload,
            headers: Vec::new(),
            suffix: String::new(),
        }
    }

    /// Set `key` to `value`, overwriting any earlier value for the same key.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        put_header(&mut self.headers, key.into(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Insert or overwrite a header in an ordered list, matching keys
/// case-insensitively.
pub(crate) fn put_header(headers: &mut Vec<(String, String)>, key: String, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
        Some(entry) => entry.1 = value,
        None => headers.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_starts_bare() {
        let ar = ApiRequest::new(HttpMethod::Get, "job/x", None);
        assert!(ar.headers.is_empty());
        assert!(ar.suffix.is_empty());
        assert!(ar.payload.is_none());
    }

    #[test]
    fn set_header_overwrites_case_insensitively() {
        let mut ar = ApiRequest::new(HttpMethod::Post, "job/x/build", None);
        ar.set_header("Content-Type", "application/xml")
            .set_header("Jenkins-Crumb", "abc")
            .set_header("content-type", "application/x-www-form-urlencoded");

        assert_eq!(ar.headers.len(), 2);
        assert_eq!(ar.header("CONTENT-TYPE"), Some("application/x-www-form-urlencoded"));
        assert_eq!(ar.headers[1], ("Jenkins-Crumb".to_string(), "abc".to_string()));
    }
}
