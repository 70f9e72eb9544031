use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::claims::ClaimSet;
use crate::clock::{Clock, SystemClock};
use crate::config::ProviderConfig;
use crate::error::{OidcError, OidcResult};
use crate::keys::SigningKeyResolver;
use crate::metrics::VerifierMetrics;
use crate::token::DecodedToken;

/// Validates OpenID Connect ID tokens against a provider and an expected nonce.
///
/// Holds no per-call state; one instance serves any number of concurrent
/// validations.
#[derive(Clone)]
pub struct IdTokenVerifier<R> {
    resolver: R,
    clock: Arc<dyn Clock>,
    metrics: Option<VerifierMetrics>,
}

impl<R: SigningKeyResolver> IdTokenVerifier<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_metrics(mut self, metrics: VerifierMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn metrics(&self) -> Option<&VerifierMetrics> {
        self.metrics.as_ref()
    }

    /// Returns the token's claim set only if every check passes.
    ///
    /// An empty `expected_nonce` means the authentication request carried no
    /// nonce; a token that nevertheless holds one is rejected.
    pub fn validate(
        &self,
        provider: &ProviderConfig,
        expected_nonce: &str,
        raw_token: &str,
    ) -> OidcResult<ClaimSet> {
        let outcome = self.check(provider, expected_nonce, raw_token);
        match &outcome {
            Ok(_) => {
                debug!(issuer = %provider.issuer, "verified ID token");
                if let Some(metrics) = &self.metrics {
                    metrics.accepted();
                }
            }
            Err(err) => {
                warn!(
                    issuer = %provider.issuer,
                    kind = err.kind().as_str(),
                    error = %err,
                    "ID token rejected"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.rejected(err);
                }
            }
        }
        outcome
    }

    pub fn is_valid(&self, provider: &ProviderConfig, expected_nonce: &str, raw_token: &str) -> bool {
        self.validate(provider, expected_nonce, raw_token).is_ok()
    }

    fn check(
        &self,
        provider: &ProviderConfig,
        expected_nonce: &str,
        raw_token: &str,
    ) -> OidcResult<ClaimSet> {
        let token = DecodedToken::parse(raw_token)?;
        self.verify_signature(provider, &token, raw_token)?;
        let claims = token.claims;

        if claims.subject()?.is_empty() {
            return Err(OidcError::MalformedToken("empty 'sub' claim".into()));
        }
        if claims.issuer()? != provider.issuer {
            return Err(OidcError::ClaimMismatch("iss"));
        }
        if !claims.audience()?.contains(&provider.client_id) {
            return Err(OidcError::ClaimMismatch("aud"));
        }
        verify_nonce(expected_nonce, claims.nonce()?)?;
        if provider.enforce_expiry {
            verify_lifetime(provider, &claims, self.clock.now_secs())?;
        }

        Ok(claims)
    }

    fn verify_signature(
        &self,
        provider: &ProviderConfig,
        token: &DecodedToken<'_>,
        raw_token: &str,
    ) -> OidcResult<()> {
        let alg = &token.header.alg;
        let algorithm = Algorithm::from_str(alg)
            .ok()
            .filter(|algorithm| provider.accepts(*algorithm))
            .ok_or_else(|| OidcError::InvalidSignature(format!("algorithm '{alg}' not accepted")))?;

        // Keys come from the configured issuer, never from the unverified iss claim.
        let key = self
            .resolver
            .resolve_signing_key(&provider.issuer, token.header.kid.as_deref())
            .map_err(|err| OidcError::InvalidSignature(format!("signing key unavailable: {err}")))?;

        // Pinned to one algorithm so decode refuses a key of another family.
        // Claim checks happen afterwards, in order.
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        decode::<Value>(raw_token, &key, &validation)?;
        Ok(())
    }
}

fn verify_nonce(expected: &str, claimed: Option<&str>) -> OidcResult<()> {
    match (expected.is_empty(), claimed) {
        (true, None) => Ok(()),
        (true, Some(_)) => Err(OidcError::ClaimMismatch("nonce")),
        (false, None) => Err(OidcError::MalformedToken("missing 'nonce' claim".into())),
        // Digests keep the comparison independent of where the values diverge.
        (false, Some(claimed)) if Sha256::digest(claimed) == Sha256::digest(expected) => Ok(()),
        (false, Some(_)) => Err(OidcError::ClaimMismatch("nonce")),
    }
}

fn verify_lifetime(provider: &ProviderConfig, claims: &ClaimSet, now: i64) -> OidcResult<()> {
    let leeway = i64::from(provider.leeway_seconds);
    let exp = claims
        .get_optional_i64("exp")?
        .ok_or_else(|| OidcError::MalformedToken("missing 'exp' claim".into()))?;
    if exp.saturating_add(leeway) <= now {
        return Err(OidcError::ClaimMismatch("exp"));
    }
    if let Some(nbf) = claims.get_optional_i64("nbf")? {
        if nbf > now.saturating_add(leeway) {
            return Err(OidcError::ClaimMismatch("nbf"));
        }
    }
    Ok(())
}
