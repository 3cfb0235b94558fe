//! Credentials store operations built on top of [`Requester`].
//!
//! Each operation only picks an endpoint under the domain path and a payload
//! shape; all protocol handling stays in the requester.

use crate::decode::Text;
use crate::error::ApiError;
use crate::request::Query;
use crate::requester::Requester;
use crate::types::{DomainWrapper, UserCredential};

/// Path of the global domain of the system credentials store.
pub const SYSTEM_DOMAIN: &str = "credentials/store/system/domain/_/";

/// Credentials of one domain. `base` ends with `/`.
#[derive(Debug, Clone)]
pub struct Credentials<'a> {
    requester: &'a Requester,
    base: String,
}

impl<'a> Credentials<'a> {
    pub fn new(requester: &'a Requester, base: impl Into<String>) -> Self {
        Self {
            requester,
            base: base.into(),
        }
    }

    /// The global domain of the system store.
    pub fn system(requester: &'a Requester) -> Self {
        Self::new(requester, SYSTEM_DOMAIN)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Create a credential from its XML description.
    pub fn create(&self, xml: &str) -> Result<(), ApiError> {
        let endpoint = format!("{}createCredentials", self.base);
        self.requester
            .post(&endpoint, Some(xml.as_bytes()), Text, &Query::new())
            .map(|_| ())
            .inspect_err(|error| tracing::error!(%error, "credentials create failed"))
    }

    /// List every credential of the domain, in the order the server sends.
    pub fn get_all(&self) -> Result<Vec<UserCredential>, ApiError> {
        let endpoint = format!("{}api/xml", self.base);
        let query = Query::from([("depth".to_string(), "1".to_string())]);
        let reply = self.requester.get_xml(&endpoint, Text, &query)?;
        Ok(parse_domain(&reply.value)?.user_credentials)
    }

    pub fn remove(&self, id: &str) -> Result<(), ApiError> {
        let endpoint = format!("{}credential/{id}/doDelete", self.base);
        self.requester
            .post(&endpoint, None, Text, &Query::new())
            .map(|_| ())
            .inspect_err(|error| tracing::error!(%error, id, "credentials remove failed"))
    }
}

/// Parse a `domainWrapper` XML document.
pub fn parse_domain(xml: &str) -> Result<DomainWrapper, ApiError> {
    Ok(quick_xml::de::from_str(xml)?)
}
