//! OpenID Connect discovery (`/.well-known/openid-configuration`).

use reqwest::Client;
use serde::Deserialize;

use crate::error::{OidcError, OidcResult};

/// Provider metadata, limited to the fields this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

pub fn discovery_url(issuer: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    )
}

pub async fn fetch_discovery(client: &Client, issuer: &str) -> OidcResult<DiscoveryDocument> {
    let url = discovery_url(issuer);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|err| OidcError::DiscoveryFetch(err.to_string()))?;

    if !response.status().is_success() {
        return Err(OidcError::DiscoveryFetch(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }

    let doc: DiscoveryDocument = response
        .json()
        .await
        .map_err(|err| OidcError::DiscoveryDecode(err.to_string()))?;

    if doc.issuer.trim_end_matches('/') != issuer.trim_end_matches('/') {
        return Err(OidcError::IssuerMismatch {
            expected: issuer.to_string(),
            actual: doc.issuer,
        });
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_well_known_url() {
        assert_eq!(
            discovery_url("https://example.com/"),
            "https://example.com/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("https://example.com/realms/main"),
            "https://example.com/realms/main/.well-known/openid-configuration"
        );
    }
}
