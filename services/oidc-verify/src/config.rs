use anyhow::{anyhow, Context, Result};
use common_oidc::ProviderConfig;
use std::env;

/// Where the provider's signing keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Jwks(String),
    Discovery(String),
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub provider: ProviderConfig,
    pub keys: KeySource,
}

pub fn load_verifier_config() -> Result<VerifierConfig> {
    let client_id = env::var("OIDC_CLIENT_ID")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("OIDC_CLIENT_ID must be set"))?;

    let issuer = env::var("OIDC_ISSUER")
        .ok()
        .and_then(|value| normalize_optional(&value));
    let authorization_endpoint = env::var("OIDC_AUTHORIZATION_ENDPOINT")
        .ok()
        .and_then(|value| normalize_optional(&value));

    let mut provider = match (issuer, authorization_endpoint) {
        (Some(issuer), _) => ProviderConfig::new(issuer, client_id),
        (None, Some(endpoint)) => ProviderConfig::from_authorization_endpoint(&endpoint, client_id)
            .context("Failed to parse OIDC_AUTHORIZATION_ENDPOINT")?,
        (None, None) => {
            return Err(anyhow!(
                "Either OIDC_ISSUER or OIDC_AUTHORIZATION_ENDPOINT must be set"
            ))
        }
    };

    if let Some(leeway) = env::var("OIDC_LEEWAY_SECONDS")
        .ok()
        .and_then(|value| normalize_optional(&value))
    {
        let seconds = leeway
            .parse::<u32>()
            .with_context(|| format!("Invalid OIDC_LEEWAY_SECONDS '{leeway}'"))?;
        provider = provider.with_leeway(seconds);
    }
    provider = provider.with_expiry_enforced(bool_from_env("OIDC_ENFORCE_EXPIRY").unwrap_or(false));

    let jwks_url = env::var("OIDC_JWKS_URL")
        .ok()
        .and_then(|value| normalize_optional(&value));
    let keys = match jwks_url {
        Some(url) => KeySource::Jwks(url),
        None if bool_from_env("OIDC_DISCOVERY").unwrap_or(false) => {
            KeySource::Discovery(discovery_issuer(&provider.issuer))
        }
        None => {
            return Err(anyhow!(
                "Set OIDC_JWKS_URL, or OIDC_DISCOVERY=true to locate keys via discovery"
            ))
        }
    };

    Ok(VerifierConfig { provider, keys })
}

fn discovery_issuer(issuer: &str) -> String {
    if issuer.contains("://") {
        issuer.to_string()
    } else {
        format!("https://{issuer}")
    }
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
