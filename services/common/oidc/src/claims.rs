use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{OidcError, OidcResult};

/// Intended recipients of an ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Single(String),
    Multiple(BTreeSet<String>),
}

impl Audience {
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::Single(value) => value == client_id,
            Audience::Multiple(values) => values.contains(client_id),
        }
    }
}

/// Claim set decoded from an ID token payload, kept exactly as issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClaimSet {
    inner: Map<String, Value>,
}

impl ClaimSet {
    pub fn new(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Required string claim.
    pub fn get_string(&self, name: &str) -> OidcResult<&str> {
        self.get_optional_string(name)?
            .ok_or_else(|| OidcError::MalformedToken(format!("missing '{name}' claim")))
    }

    pub fn get_optional_string(&self, name: &str) -> OidcResult<Option<&str>> {
        match self.inner.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(type_mismatch(name, "a string")),
        }
    }

    /// Required claim that may be a single string or a list of strings.
    pub fn get_string_or_list(&self, name: &str) -> OidcResult<Audience> {
        match self.inner.get(name) {
            None => Err(OidcError::MalformedToken(format!("missing '{name}' claim"))),
            Some(Value::String(value)) => Ok(Audience::Single(value.clone())),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(value) => Ok(value.clone()),
                    _ => Err(type_mismatch(name, "a list of strings")),
                })
                .collect::<OidcResult<BTreeSet<_>>>()
                .map(Audience::Multiple),
            Some(_) => Err(type_mismatch(name, "a string or a list of strings")),
        }
    }

    pub fn get_optional_i64(&self, name: &str) -> OidcResult<Option<i64>> {
        match self.inner.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| type_mismatch(name, "an integer")),
        }
    }

    pub fn issuer(&self) -> OidcResult<&str> {
        self.get_string("iss")
    }

    pub fn subject(&self) -> OidcResult<&str> {
        self.get_string("sub")
    }

    pub fn audience(&self) -> OidcResult<Audience> {
        self.get_string_or_list("aud")
    }

    pub fn nonce(&self) -> OidcResult<Option<&str>> {
        self.get_optional_string("nonce")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.inner
    }
}

impl From<ClaimSet> for Value {
    fn from(value: ClaimSet) -> Self {
        Value::Object(value.inner)
    }
}

fn type_mismatch(name: &str, expected: &str) -> OidcError {
    OidcError::MalformedToken(format!("claim '{name}' must be {expected}"))
}
