use jsonwebtoken::Algorithm;
use url::Url;

use crate::error::{OidcError, OidcResult};

/// Relying-party view of an OpenID Connect provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Expected issuer claim (iss), compared exactly.
    pub issuer: String,
    /// Identifier this application is registered under; must appear in aud.
    pub client_id: String,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u32,
    /// Require an unexpired `exp` claim.
    pub enforce_expiry: bool,
    /// Signature algorithms accepted from this provider.
    pub algorithms: Vec<Algorithm>,
}

/// Asymmetric algorithms only; an HMAC token keyed with a public key must never verify.
pub const DEFAULT_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

impl ProviderConfig {
    /// Construct config with a 30 second leeway and expiry checks disabled.
    pub fn new(issuer: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            leeway_seconds: 30,
            enforce_expiry: false,
            algorithms: DEFAULT_ALGORITHMS.to_vec(),
        }
    }

    /// Derive the issuer from the host of the provider's authorization endpoint.
    ///
    /// Providers registered with nothing but their endpoints sign tokens with
    /// the bare host as `iss` (`https://example.com/oauth2/auth` issues for
    /// `example.com`).
    pub fn from_authorization_endpoint(
        endpoint: &str,
        client_id: impl Into<String>,
    ) -> OidcResult<Self> {
        let url = Url::parse(endpoint)
            .map_err(|err| OidcError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| OidcError::InvalidEndpoint(format!("{endpoint}: missing host")))?;
        Ok(Self::new(host, client_id))
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_expiry_enforced(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }

    pub fn with_algorithms(mut self, algorithms: impl Into<Vec<Algorithm>>) -> Self {
        self.algorithms = algorithms.into();
        self
    }

    pub fn accepts(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }
}
