// src/client.rs

use crate::error::AuthError;
use crate::model::{JsonWebKey, JsonWebKeySet, TokenHeader};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// A client for fetching JSON Web Keys (JWKs) from an OIDC provider.
///
/// Keys are fetched fresh on every call: each authentication attempt is
/// request-scoped and must observe the provider's current key set, so there
/// is deliberately no cache between invocations.
#[derive(Clone)]
pub struct JwksClient {
    http_client: reqwest::Client,
    jwks_url: Url,
}

impl JwksClient {
    /// Creates a new `JwksClient` with a bounded request timeout.
    pub fn new(jwks_url: Url, timeout: Duration) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::KeySourceUnavailable)?;
        Ok(Self {
            http_client,
            jwks_url,
        })
    }

    /// Fetches the provider's published key set.
    ///
    /// Transport failures and non-2xx statuses surface as
    /// `KeySourceUnavailable`; an unparsable body or an empty `keys` list as
    /// `KeySourceInvalid`.
    #[instrument(skip(self), err)]
    pub async fn fetch_keys(&self) -> Result<Vec<JsonWebKey>, AuthError> {
        let response = self
            .http_client
            .get(self.jwks_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AuthError::KeySourceUnavailable)?;

        let body = response
            .text()
            .await
            .map_err(AuthError::KeySourceUnavailable)?;
        let jwks: JsonWebKeySet = serde_json::from_str(&body)
            .map_err(|e| AuthError::KeySourceInvalid(e.to_string()))?;

        if jwks.keys.is_empty() {
            return Err(AuthError::KeySourceInvalid(
                "JWKS contains no keys".to_string(),
            ));
        }

        debug!("Fetched {} keys from {}", jwks.keys.len(), self.jwks_url);
        Ok(jwks.keys)
    }
}

/// Decodes the `kid` and `alg` fields of a token header without verifying
/// the signature.
///
/// This is tolerant of algorithm labels `jsonwebtoken` does not recognize;
/// only the base64url/JSON structure of the first segment matters here.
pub fn decode_token_header(token: &str) -> Result<TokenHeader, AuthError> {
    let header_segment = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::TokenMalformed("empty token".to_string()))?;
    let header_bytes = base64_url::decode(header_segment)
        .map_err(|e| AuthError::TokenMalformed(e.to_string()))?;
    serde_json::from_slice(&header_bytes).map_err(|e| AuthError::TokenMalformed(e.to_string()))
}

/// Selects the JWKS key that should verify the given token header.
///
/// The fallback chain is an ordered rule list, evaluated top to bottom with
/// early return so each rule stays auditable in isolation:
///
/// 1. A key whose `kid` matches the header's non-empty `kid` wins, and its
///    `alg` label is intentionally NOT checked against the header's. Globus
///    publishes `RS256` in jwk.json but signs ID tokens with `RS512`;
///    enforcing agreement on a kid hit would reject every Globus token. This
///    relaxation is specific to that known metadata bug and applies only on
///    an exact kid match.
/// 2. If the set holds exactly one key, use it unconditionally.
/// 3. The first key whose `alg` label equals the header's `alg`.
/// 4. Otherwise fail, reporting the header kid and every available kid.
///
/// Selection performs no cryptography; verification is the caller's job.
pub fn select_key<'a>(
    keys: &'a [JsonWebKey],
    header: &TokenHeader,
) -> Result<&'a JsonWebKey, AuthError> {
    if keys.is_empty() {
        return Err(AuthError::KeySourceInvalid(
            "JWKS contains no keys".to_string(),
        ));
    }

    // Rule 1: kid match, algorithm label ignored.
    if let Some(kid) = header.kid.as_deref().filter(|k| !k.is_empty()) {
        if let Some(key) = keys.iter().find(|k| k.kid.as_deref() == Some(kid)) {
            debug!(
                "Found matching key by kid: {} (key claims alg {:?})",
                kid, key.alg
            );
            return Ok(key);
        }
    }

    // Rule 2: single available key.
    if let [only] = keys {
        debug!("Using single available key (no kid match)");
        return Ok(only);
    }

    // Rule 3: match by algorithm label.
    if let Some(alg) = header.alg.as_deref() {
        if let Some(key) = keys.iter().find(|k| k.alg.as_deref() == Some(alg)) {
            debug!("Using key matched by algorithm: {}", alg);
            return Ok(key);
        }
    }

    let available: Vec<String> = keys.iter().filter_map(|k| k.kid.clone()).collect();
    error!(
        "No matching key found. Token kid: {:?}, available kids: {:?}",
        header.kid, available
    );
    Err(AuthError::KeyNotFound {
        kid: header.kid.clone(),
        available,
    })
}
