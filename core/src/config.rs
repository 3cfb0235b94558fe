//! Client configuration.
//!
//! A `ClientConfig` is built once and never mutated afterwards; every call
//! made through a `Requester` reads it by reference. Two requesters with
//! different configs can live side by side in one process.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Credentials attached to every request and to every redirect hop.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for one automation server.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Root URL every endpoint is resolved against.
    pub base_url: String,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    /// Extra PEM root certificate to trust.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// When false, server certificates are not verified.
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_ssl_verify() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            basic_auth: None,
            ca_cert: None,
            ssl_verify: default_ssl_verify(),
            max_redirects: default_max_redirects(),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }
}
