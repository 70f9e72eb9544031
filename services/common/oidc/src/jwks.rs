use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{OidcError, OidcResult};
use crate::keys::{InMemoryKeyStore, SigningKeyResolver};

/// Store id given to published keys that carry no `kid`.
pub const ANONYMOUS_KID_PREFIX: &str = "jwks-anonymous-";

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> OidcResult<Vec<(String, DecodingKey)>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| OidcError::JwksFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(OidcError::JwksFetch(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| OidcError::JwksDecode(err.to_string()))?;

        let mut keys = Vec::new();
        for (index, key) in body.keys.into_iter().enumerate() {
            if matches!(key.use_.as_deref(), Some(usage) if usage != "sig") {
                debug!(kid = ?key.kid, "skipping JWKS key not meant for signatures");
                continue;
            }
            // kid is optional; a lone kid-less key is still reachable through
            // the store's single-key lookup.
            let kid = key.kid.unwrap_or_else(|| format!("{ANONYMOUS_KID_PREFIX}{index}"));

            let kty = key.kty.unwrap_or_else(|| "RSA".to_string());
            let decoding_key = match kty.as_str() {
                "RSA" => {
                    let (modulus, exponent) = key
                        .n
                        .zip(key.e)
                        .ok_or_else(|| OidcError::JwksMissingComponents(kid.clone()))?;
                    DecodingKey::from_rsa_components(&modulus, &exponent)
                }
                "EC" => {
                    let (x, y) = key
                        .x
                        .zip(key.y)
                        .ok_or_else(|| OidcError::JwksMissingComponents(kid.clone()))?;
                    DecodingKey::from_ec_components(&x, &y)
                }
                other => {
                    return Err(OidcError::JwksUnsupportedKey {
                        kid,
                        kty: other.to_string(),
                    })
                }
            }
            .map_err(|err| OidcError::KeyParse(kid.clone(), err.to_string()))?;
            keys.push((kid, decoding_key));
        }

        Ok(keys)
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    #[serde(rename = "use")]
    use_: Option<String>,
    n: Option<String>,
    e: Option<String>,
    x: Option<String>,
    y: Option<String>,
}

/// Provider keys published through a JWKS endpoint, cached in memory.
#[derive(Clone)]
pub struct JwksKeySource {
    store: InMemoryKeyStore,
    fetcher: JwksFetcher,
}

impl JwksKeySource {
    pub fn new(fetcher: JwksFetcher) -> Self {
        Self {
            store: InMemoryKeyStore::new(),
            fetcher,
        }
    }

    pub fn with_store(fetcher: JwksFetcher, store: InMemoryKeyStore) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &InMemoryKeyStore {
        &self.store
    }

    pub fn fetcher(&self) -> &JwksFetcher {
        &self.fetcher
    }

    /// Reload keys; a failed or empty fetch keeps the previous key set.
    pub async fn refresh(&self) -> OidcResult<usize> {
        let keys = match self.fetcher.fetch().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(url = self.fetcher.url(), error = %err, "JWKS refresh failed");
                return Err(err);
            }
        };
        let count = keys.len();
        if count > 0 {
            self.store.replace_all(keys);
        }
        debug!(url = self.fetcher.url(), count, "refreshed JWKS");
        Ok(count)
    }
}

impl SigningKeyResolver for JwksKeySource {
    fn resolve_signing_key(&self, issuer: &str, key_id: Option<&str>) -> OidcResult<DecodingKey> {
        self.store.resolve_signing_key(issuer, key_id)
    }
}
