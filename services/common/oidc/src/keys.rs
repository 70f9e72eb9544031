use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use jsonwebtoken::DecodingKey;

use crate::error::{OidcError, OidcResult};

/// Capability to look up the key an issuer signs with.
pub trait SigningKeyResolver: Send + Sync {
    fn resolve_signing_key(&self, issuer: &str, key_id: Option<&str>) -> OidcResult<DecodingKey>;
}

impl<R: SigningKeyResolver + ?Sized> SigningKeyResolver for Arc<R> {
    fn resolve_signing_key(&self, issuer: &str, key_id: Option<&str>) -> OidcResult<DecodingKey> {
        (**self).resolve_signing_key(issuer, key_id)
    }
}

impl<R: SigningKeyResolver + ?Sized> SigningKeyResolver for &R {
    fn resolve_signing_key(&self, issuer: &str, key_id: Option<&str>) -> OidcResult<DecodingKey> {
        (**self).resolve_signing_key(issuer, key_id)
    }
}

/// Thread-safe store for decoding keys of a single provider.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    inner: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, DecodingKey>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, DecodingKey>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_key(&self, kid: impl Into<String>, key: DecodingKey) {
        self.write().insert(kid.into(), key);
    }

    pub fn insert_rsa_pem(&self, kid: impl Into<String>, pem: &[u8]) -> OidcResult<()> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| OidcError::KeyParse(kid.clone(), err.to_string()))?;
        self.insert_key(kid, key);
        Ok(())
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.read().get(kid).cloned()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.read().contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, DecodingKey)>,
    {
        let mut guard = self.write();
        guard.clear();
        guard.extend(entries);
    }
}

impl SigningKeyResolver for InMemoryKeyStore {
    fn resolve_signing_key(&self, _issuer: &str, key_id: Option<&str>) -> OidcResult<DecodingKey> {
        let guard = self.read();
        match key_id {
            Some(kid) => guard
                .get(kid)
                .cloned()
                .ok_or_else(|| OidcError::UnknownKeyId(kid.to_string())),
            // Without a kid only an unambiguous key set can be used.
            None if guard.len() == 1 => guard
                .values()
                .next()
                .cloned()
                .ok_or(OidcError::MissingKeyId),
            None => Err(OidcError::MissingKeyId),
        }
    }
}
