use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("malformed ID token: {0}")]
    MalformedToken(String),
    #[error("ID token signature rejected: {0}")]
    InvalidSignature(String),
    #[error("ID token claim '{0}' does not match the expected value")]
    ClaimMismatch(&'static str),
    #[error("token missing kid header and the key set is ambiguous")]
    MissingKeyId,
    #[error("no decoding key registered for kid '{0}'")]
    UnknownKeyId(String),
    #[error("failed to parse decoding key for kid '{0}': {1}")]
    KeyParse(String, String),
    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),
    #[error("failed to parse JWKS response: {0}")]
    JwksDecode(String),
    #[error("JWKS key '{0}' missing required key components")]
    JwksMissingComponents(String),
    #[error("JWKS key '{kid}' uses unsupported key type '{kty}'")]
    JwksUnsupportedKey { kid: String, kty: String },
    #[error("failed to fetch discovery document: {0}")]
    DiscoveryFetch(String),
    #[error("failed to parse discovery document: {0}")]
    DiscoveryDecode(String),
    #[error("discovery issuer mismatch: expected '{expected}', got '{actual}'")]
    IssuerMismatch { expected: String, actual: String },
    #[error("invalid provider endpoint {0}")]
    InvalidEndpoint(String),
}

/// Coarse classification used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Malformed,
    Signature,
    Claims,
    Provider,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::Malformed => "malformed",
            RejectionKind::Signature => "invalid_signature",
            RejectionKind::Claims => "claim_mismatch",
            RejectionKind::Provider => "provider_error",
        }
    }
}

impl OidcError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            OidcError::MalformedToken(_) => RejectionKind::Malformed,
            OidcError::InvalidSignature(_)
            | OidcError::MissingKeyId
            | OidcError::UnknownKeyId(_)
            | OidcError::KeyParse(_, _) => RejectionKind::Signature,
            OidcError::ClaimMismatch(_) => RejectionKind::Claims,
            OidcError::JwksFetch(_)
            | OidcError::JwksDecode(_)
            | OidcError::JwksMissingComponents(_)
            | OidcError::JwksUnsupportedKey { .. }
            | OidcError::DiscoveryFetch(_)
            | OidcError::DiscoveryDecode(_)
            | OidcError::IssuerMismatch { .. }
            | OidcError::InvalidEndpoint(_) => RejectionKind::Provider,
        }
    }

    /// True for every failure of the token itself, as opposed to the provider.
    pub fn is_rejection(&self) -> bool {
        self.kind() != RejectionKind::Provider
    }
}

impl From<jsonwebtoken::errors::Error> for OidcError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidSignature(value.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        // Token failures all look alike from the outside.
        let (status, body) = if self.is_rejection() {
            (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "AUTH_ID_TOKEN",
                    message: "ID token rejected",
                },
            )
        } else {
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "AUTH_PROVIDER",
                    message: "identity provider unavailable",
                },
            )
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_share_one_response() {
        let errors = [
            OidcError::MalformedToken("bad segment".into()),
            OidcError::InvalidSignature("bad sig".into()),
            OidcError::ClaimMismatch("aud"),
            OidcError::UnknownKeyId("kid".into()),
        ];
        for err in errors {
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn provider_failures_are_not_rejections() {
        let err = OidcError::JwksFetch("HTTP 502".into());
        assert!(!err.is_rejection());
        assert_eq!(err.kind().as_str(), "provider_error");
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn kinds_map_to_metric_labels() {
        assert_eq!(
            OidcError::MalformedToken(String::new()).kind().as_str(),
            "malformed"
        );
        assert_eq!(OidcError::ClaimMismatch("iss").kind(), RejectionKind::Claims);
        assert_eq!(OidcError::MissingKeyId.kind(), RejectionKind::Signature);
    }
}
