// src/model.rs

use serde::{Deserialize, Serialize};

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
///
/// `kid` and `alg` are optional: Globus publishes both, but the selection
/// policy must cope with providers that omit either.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonWebKey {
    pub kid: Option<String>,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_purpose: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// The `kid` and `alg` fields of a token header, decoded without verifying
/// the signature.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    pub kid: Option<String>,
    pub alg: Option<String>,
}

/// The standard claims decoded from a valid ID token.
///
/// Custom claims can be accessed by validating into a user-defined struct
/// that implements `serde::Deserialize`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
}

/// One linked identity from a provider's `identity_set` claim.
///
/// Globus reports every identity linked to the authenticated account here;
/// the `username` of an institutional identity is its EPPN
/// (e.g. `"cnh@mit.edu"`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkedIdentity {
    pub username: Option<String>,
    pub sub: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The userinfo claims handed to identity resolution after token exchange.
///
/// Everything is optional; which fields must be present depends on the
/// configured [`IdentityPolicy`](crate::identity::IdentityPolicy).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserInfo {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub identity_set: Vec<LinkedIdentity>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
