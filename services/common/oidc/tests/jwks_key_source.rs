use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common_oidc::{
    fetch_discovery, IdTokenVerifier, JwksFetcher, JwksKeySource, OidcError, ProviderConfig,
    SigningKeyResolver,
};
use httpmock::prelude::*;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::json;

struct Signer {
    encoding: EncodingKey,
    modulus: String,
    exponent: String,
}

fn signer() -> Signer {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");

    Signer {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}

fn jwks_body(signer: &Signer, kid: &str) -> serde_json::Value {
    json!({
        "keys": [
            {
                "kid": "encryption-key",
                "kty": "RSA",
                "use": "enc",
                "n": signer.modulus,
                "e": signer.exponent
            },
            {
                "kid": kid,
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "n": signer.modulus,
                "e": signer.exponent
            }
        ]
    })
}

fn issue(signer: &Signer, kid: &str, issuer: &str, nonce: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let claims = json!({
        "iss": issuer,
        "aud": "client_id",
        "sub": "123",
        "nonce": nonce,
    });
    encode(&header, &claims, &signer.encoding).expect("sign token")
}

#[tokio::test]
async fn verifies_tokens_against_fetched_keys() {
    let signer = signer();
    let server = MockServer::start();
    let _mock = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200)
            .header("content-type", "application/json")
            .body(jwks_body(&signer, "sig-key").to_string());
    });

    let source = JwksKeySource::new(JwksFetcher::new(format!("{}/jwks", server.base_url())));
    assert!(source.store().is_empty());
    let refreshed = source.refresh().await.expect("refresh succeeds");
    assert_eq!(refreshed, 1);
    assert!(source.store().contains("sig-key"));
    assert!(!source.store().contains("encryption-key"));

    let verifier = IdTokenVerifier::new(source);
    let provider = ProviderConfig::new("https://login.example.com", "client_id");
    let token = issue(&signer, "sig-key", "https://login.example.com", "n-0S6_WzA2Mj");
    let claims = verifier
        .validate(&provider, "n-0S6_WzA2Mj", &token)
        .expect("token verifies");
    assert_eq!(claims.subject().expect("sub"), "123");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_keys() {
    let signer = signer();
    let server = MockServer::start();
    let mut ok = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200)
            .header("content-type", "application/json")
            .body(jwks_body(&signer, "sig-key").to_string());
    });

    let source = JwksKeySource::new(JwksFetcher::new(format!("{}/jwks", server.base_url())));
    source.refresh().await.expect("refresh succeeds");
    ok.delete();

    let _failing = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(502);
    });
    match source.refresh().await {
        Err(OidcError::JwksFetch(_)) => (),
        other => panic!("unexpected refresh result: {other:?}"),
    }
    assert!(source
        .resolve_signing_key("https://login.example.com", Some("sig-key"))
        .is_ok());
}

#[tokio::test]
async fn rejects_unsupported_key_types() {
    let server = MockServer::start();
    let _mock = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200)
            .header("content-type", "application/json")
            .body(json!({ "keys": [ { "kid": "k", "kty": "oct", "k": "c2VjcmV0" } ] }).to_string());
    });

    let fetcher = JwksFetcher::new(format!("{}/jwks", server.base_url()));
    match fetcher.fetch().await {
        Err(OidcError::JwksUnsupportedKey { kid, kty }) => {
            assert_eq!(kid, "k");
            assert_eq!(kty, "oct");
        }
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected unsupported key error"),
    }
}

#[tokio::test]
async fn single_key_without_kid_serves_tokens_without_kid() {
    let signer = signer();
    let server = MockServer::start();
    let _mock = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                json!({
                    "keys": [
                        { "kty": "RSA", "use": "enc", "n": signer.modulus, "e": signer.exponent },
                        { "kty": "RSA", "use": "sig", "n": signer.modulus, "e": signer.exponent }
                    ]
                })
                .to_string(),
            );
    });

    let source = JwksKeySource::new(JwksFetcher::new(format!("{}/jwks", server.base_url())));
    assert_eq!(source.refresh().await.expect("refresh succeeds"), 1);

    let claims = json!({
        "iss": "https://login.example.com",
        "aud": "client_id",
        "sub": "123",
        "nonce": "n-0S6_WzA2Mj",
    });
    let token = encode(&Header::new(Algorithm::RS256), &claims, &signer.encoding)
        .expect("sign token");

    let verifier = IdTokenVerifier::new(source);
    let provider = ProviderConfig::new("https://login.example.com", "client_id");
    let claims = verifier
        .validate(&provider, "n-0S6_WzA2Mj", &token)
        .expect("token verifies");
    assert_eq!(claims.subject().expect("sub"), "123");
}

#[tokio::test]
async fn discovery_document_must_name_requested_issuer() {
    let server = MockServer::start();
    let issuer = server.base_url();
    let _mock = server.mock(|when, then| {
        when.method(GET).path("/.well-known/openid-configuration");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                json!({
                    "issuer": "https://evil.example.com",
                    "jwks_uri": "https://evil.example.com/jwks"
                })
                .to_string(),
            );
    });

    let client = reqwest::Client::new();
    match fetch_discovery(&client, &issuer).await {
        Err(OidcError::IssuerMismatch { actual, .. }) => {
            assert_eq!(actual, "https://evil.example.com")
        }
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected issuer mismatch"),
    }
}

#[tokio::test]
async fn discovery_document_points_at_jwks() {
    let server = MockServer::start();
    let issuer = server.base_url();
    let _mock = server.mock(|when, then| {
        when.method(GET).path("/.well-known/openid-configuration");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                json!({
                    "issuer": format!("{issuer}/"),
                    "jwks_uri": format!("{issuer}/jwks"),
                    "authorization_endpoint": format!("{issuer}/oauth2/auth")
                })
                .to_string(),
            );
    });

    let doc = fetch_discovery(&reqwest::Client::new(), &issuer)
        .await
        .expect("discovery succeeds");
    assert_eq!(doc.jwks_uri, format!("{issuer}/jwks"));
    assert_eq!(
        doc.authorization_endpoint.as_deref(),
        Some(format!("{issuer}/oauth2/auth").as_str())
    );
    assert!(doc.token_endpoint.is_none());
}
