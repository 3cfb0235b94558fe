//! Credential store DTOs.
//!
//! # Design
//! These mirror the XML the server returns for a credentials domain
//! (`.../domain/_/api/xml?depth=1`). Every field defaults to empty so a
//! server that omits an element does not break the parse. The mock server
//! writes the same shape independently; integration tests catch drift.

use serde::Deserialize;

/// One stored credential as listed by its domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserCredential {
    pub description: String,
    pub display_name: String,
    pub fingerprint: String,
    pub full_name: String,
    pub id: String,
    pub type_name: String,
}

/// A credentials domain and the credentials it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename = "domainWrapper", rename_all = "camelCase", default)]
pub struct DomainWrapper {
    #[serde(rename = "@_class")]
    pub class: String,
    pub description: String,
    pub display_name: String,
    pub full_display_name: String,
    pub full_name: String,
    pub global: String,
    pub url_name: String,
    #[serde(rename = "credential")]
    pub user_credentials: Vec<UserCredential>,
}
