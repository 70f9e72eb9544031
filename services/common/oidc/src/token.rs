use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::claims::ClaimSet;
use crate::error::{OidcError, OidcResult};

/// JOSE header fields the verifier acts on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Compact-serialized token split into its parts; nothing here is trusted yet.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    pub header: TokenHeader,
    pub claims: ClaimSet,
    signing_input: &'a str,
    signature: &'a str,
}

impl<'a> DecodedToken<'a> {
    pub fn parse(raw: &'a str) -> OidcResult<Self> {
        let mut segments = raw.split('.');
        let (header, payload, signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None)
                    if !h.is_empty() && !p.is_empty() && !s.is_empty() =>
                {
                    (h, p, s)
                }
                _ => {
                    return Err(OidcError::MalformedToken(
                        "expected three non-empty segments".into(),
                    ))
                }
            };

        let header_json = decode_object(header, "header")?;
        let header: TokenHeader = serde_json::from_value(Value::Object(header_json))
            .map_err(|err| OidcError::MalformedToken(format!("invalid header: {err}")))?;
        let claims = ClaimSet::new(decode_object(payload, "payload")?);

        // header.payload, as signed
        let signing_input = &raw[..raw.len() - signature.len() - 1];

        Ok(Self {
            header,
            claims,
            signing_input,
            signature,
        })
    }

    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    pub fn signature(&self) -> &'a str {
        self.signature
    }
}

fn decode_object(segment: &str, part: &str) -> OidcResult<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
        .map_err(|err| OidcError::MalformedToken(format!("{part} is not base64url: {err}")))?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(OidcError::MalformedToken(format!(
            "{part} is not a JSON object"
        ))),
        Err(err) => Err(OidcError::MalformedToken(format!(
            "{part} is not valid JSON: {err}"
        ))),
    }
}
