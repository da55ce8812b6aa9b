// src/validator.rs

use crate::client::{decode_token_header, select_key, JwksClient};
use crate::config::Config;
use crate::error::AuthError;
use crate::model::JsonWebKey;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use tracing::{debug, instrument};

/// The main OIDC ID token validator.
///
/// This struct is initialized with a `Config` and should be created once and
/// reused for all validation requests. Each validation fetches the provider's
/// key set afresh and runs the relaxed key-selection policy before verifying
/// the signature and standard claims.
#[derive(Clone)]
pub struct Validator {
    config: Config,
    jwks_client: JwksClient,
}

impl Validator {
    /// Creates a new `Validator` with the given configuration.
    pub fn new(config: Config) -> Result<Self, AuthError> {
        let jwks_client = JwksClient::new(config.jwks_url.clone(), config.fetch_timeout)?;
        Ok(Self {
            config,
            jwks_client,
        })
    }

    /// Validates an OIDC ID token.
    ///
    /// This method performs a full validation of the token:
    /// 1. Decodes the header (unverified) for `kid` and `alg`.
    /// 2. Fetches the JWKS and selects a key, tolerating Globus's
    ///    algorithm-label mismatch on a `kid` hit.
    /// 3. Verifies the signature using the **header's** algorithm, never the
    ///    key record's published label.
    /// 4. Validates the standard claims (`iss`, `aud`, `exp`, `iat`).
    ///
    /// # Returns
    ///
    /// A `TokenData` object containing the decoded claims if validation is
    /// successful.
    #[instrument(skip(self, token), err)]
    pub async fn validate<T: DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<TokenData<T>, AuthError> {
        let header = decode_token_header(token)?;
        debug!("Token header - kid: {:?}, alg: {:?}", header.kid, header.alg);

        let alg_label = header
            .alg
            .as_deref()
            .ok_or_else(|| AuthError::TokenMalformed("header has no 'alg' field".to_string()))?;
        let alg = Algorithm::from_str(alg_label)
            .map_err(|_| AuthError::UnsupportedAlgorithm(alg_label.to_string()))?;
        if !self.config.validation.algorithms.contains(&alg) {
            return Err(AuthError::UnsupportedAlgorithm(alg_label.to_string()));
        }

        let keys = self.jwks_client.fetch_keys().await?;
        let jwk = select_key(&keys, &header)?;
        let decoding_key = decoding_key_for(jwk)?;

        // The token's own algorithm drives verification. The selected key may
        // carry a different published label (Globus: key says RS256, token
        // says RS512); the key material works for either.
        let mut validation = Validation::new(alg);
        validation.leeway = self.config.validation.leeway.as_secs();
        // Url renders with a trailing slash; accept both spellings of the issuer.
        let issuer = self.config.issuer_url.as_str();
        validation.set_issuer(&[issuer, issuer.trim_end_matches('/')]);
        validation.set_audience(&[&self.config.client_id]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);

        decode::<T>(token, &decoding_key, &validation).map_err(AuthError::JwtValidation)
    }
}

/// Builds a `DecodingKey` from a selected JWK's RSA components.
fn decoding_key_for(jwk: &JsonWebKey) -> Result<DecodingKey, AuthError> {
    if jwk.kty != "RSA" {
        return Err(AuthError::InvalidKeyFormat(format!(
            "unsupported key type '{}'",
            jwk.kty
        )));
    }
    let n = jwk
        .n
        .as_deref()
        .ok_or_else(|| AuthError::InvalidKeyFormat("RSA key missing 'n' component".to_string()))?;
    let e = jwk
        .e
        .as_deref()
        .ok_or_else(|| AuthError::InvalidKeyFormat("RSA key missing 'e' component".to_string()))?;
    DecodingKey::from_rsa_components(n, e).map_err(|e| AuthError::InvalidKeyFormat(e.to_string()))
}
