use globus_oidc::prelude::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::sync::OnceLock;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The signing keypair for the whole suite, generated once on first use.
fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("test key generation")
    })
}

const ISSUER: &str = "https://auth.globus.org";
const CLIENT_ID: &str = "portal-client";
const KID: &str = "globus-key-1";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Mints an RS512-signed ID token with the given kid.
fn mint_token(kid: Option<&str>, aud: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let payload = serde_json::json!({
        "iss": ISSUER,
        "sub": "globus-subject",
        "aud": aud,
        "iat": now,
        "exp": now + 3600,
        "email": "cnh@mit.edu",
    });
    let mut header = Header::new(Algorithm::RS512);
    header.kid = kid.map(String::from);
    let pkcs1_der = test_key().to_pkcs1_der().expect("test key should encode");
    let encoding_key = EncodingKey::from_rsa_der(pkcs1_der.as_bytes());
    encode(&header, &payload, &encoding_key).expect("token should encode")
}

/// The public half of the test key as a JWK, deliberately labelled RS256
/// even though tokens are signed with RS512. This reproduces the Globus
/// jwk.json metadata bug that the whole crate exists to tolerate.
fn mismatched_jwk() -> serde_json::Value {
    let public_key = test_key().to_public_key();
    let n = base64_url::encode(&public_key.n().to_bytes_be());
    let e = base64_url::encode(&public_key.e().to_bytes_be());
    serde_json::json!({
        "kty": "RSA",
        "kid": KID,
        "alg": "RS256",
        "use": "sig",
        "n": n,
        "e": e,
    })
}

async fn serve_jwks(body: serde_json::Value) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwk.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;
    mock_server
}

fn validator_for(mock_server: &MockServer) -> Validator {
    let config = ConfigBuilder::new()
        .issuer_url(ISSUER)
        .unwrap()
        .client_id(CLIENT_ID.to_string())
        .jwks_url(&format!("{}/jwk.json", mock_server.uri()))
        .unwrap()
        .build()
        .expect("config should build");
    Validator::new(config).expect("validator should build")
}

#[tokio::test]
async fn rs512_token_verifies_against_rs256_labelled_key() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), CLIENT_ID);
    let token_data = validator
        .validate::<Claims>(&token)
        .await
        .expect("RS512 token must verify despite the RS256 key label");

    assert_eq!(token_data.claims.iss, ISSUER);
    assert_eq!(token_data.claims.aud, CLIENT_ID);
    assert_eq!(token_data.claims.sub, "globus-subject");
}

#[tokio::test]
async fn singleton_key_verifies_token_without_kid() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    let validator = validator_for(&mock_server);

    // No kid in the header; the single published key must still be used.
    let token = mint_token(None, CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    assert!(result.is_ok(), "expected success, got {result:?}");
}

#[tokio::test]
async fn unreachable_key_source_is_reported() {
    init_tracing();
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwk.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    assert!(matches!(result, Err(AuthError::KeySourceUnavailable(_))));
}

#[tokio::test]
async fn unparsable_key_source_is_invalid() {
    init_tracing();
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwk.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    assert!(matches!(result, Err(AuthError::KeySourceInvalid(_))));
}

#[tokio::test]
async fn empty_key_list_is_invalid() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [] })).await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    assert!(matches!(result, Err(AuthError::KeySourceInvalid(_))));
}

#[tokio::test]
async fn garbage_token_is_malformed() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    let validator = validator_for(&mock_server);

    let result = validator.validate::<Claims>("!!not-a-token!!").await;
    assert!(matches!(result, Err(AuthError::TokenMalformed(_))));
}

#[tokio::test]
async fn no_matching_key_in_multi_key_set() {
    init_tracing();
    // Two keys, neither matching the token's kid, neither labelled RS512.
    let mut other = mismatched_jwk();
    other["kid"] = serde_json::json!("other-key");
    let mut third = mismatched_jwk();
    third["kid"] = serde_json::json!("third-key");
    third["alg"] = serde_json::json!("ES256");
    let mock_server = serve_jwks(serde_json::json!({ "keys": [other, third] })).await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some("unknown-key"), CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    match result {
        Err(AuthError::KeyNotFound { kid, available }) => {
            assert_eq!(kid.as_deref(), Some("unknown-key"));
            assert_eq!(
                available,
                vec!["other-key".to_string(), "third-key".to_string()]
            );
        }
        other => panic!("expected KeyNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_audience_fails_claim_validation() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), "some-other-client");
    let result = validator.validate::<Claims>(&token).await;
    assert!(matches!(result, Err(AuthError::JwtValidation(_))));
}

#[tokio::test]
async fn algorithm_outside_allow_list_is_rejected() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    // RS512 removed from the allow-list; an RS512 token must be rejected
    // before any key is even considered.
    let config = ConfigBuilder::new()
        .issuer_url(ISSUER)
        .unwrap()
        .client_id(CLIENT_ID.to_string())
        .jwks_url(&format!("{}/jwk.json", mock_server.uri()))
        .unwrap()
        .algorithms(vec![Algorithm::RS256])
        .build()
        .expect("config should build");
    let validator = Validator::new(config).expect("validator should build");

    let token = mint_token(Some(KID), CLIENT_ID);
    let result = validator.validate::<Claims>(&token).await;
    match result {
        Err(AuthError::UnsupportedAlgorithm(alg)) => assert_eq!(alg, "RS512"),
        other => panic!("expected UnsupportedAlgorithm, got {other:?}"),
    }
    assert!(
        mock_server.received_requests().await.unwrap().is_empty(),
        "allow-list rejection must happen before the JWKS fetch"
    );
}

#[tokio::test]
async fn full_login_flow_validates_then_provisions() {
    init_tracing();
    let mock_server = serve_jwks(serde_json::json!({ "keys": [mismatched_jwk()] })).await;
    let validator = validator_for(&mock_server);

    let token = mint_token(Some(KID), CLIENT_ID);
    let userinfo: UserInfo = validator
        .validate::<UserInfo>(&token)
        .await
        .expect("token must validate")
        .claims;

    let mut backend = AuthBackend::new(MemoryUserStore::new(), IdentityPolicy::Direct);
    let user = backend
        .authenticate(&userinfo)
        .expect("authentication must succeed");
    assert_eq!(user.username, "cnh");
    assert_eq!(user.email, "cnh@mit.edu");
    assert!(user.active);
}
