// src/error.rs

use thiserror::Error;

/// The primary error type for the `globus-oidc` library.
///
/// Every variant is terminal for the current authentication attempt; the
/// library never retries on the caller's behalf.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The JWKS endpoint could not be reached, or answered with a non-2xx status.
    #[error("could not fetch JWKS from identity provider: {0}")]
    KeySourceUnavailable(#[source] reqwest::Error),

    /// The JWKS response body was not a valid key set, or contained no keys.
    #[error("invalid JWKS response from identity provider: {0}")]
    KeySourceInvalid(String),

    /// The ID token's header segment could not be decoded.
    #[error("could not decode ID token header: {0}")]
    TokenMalformed(String),

    /// No key in the JWKS matched the token by key ID, singleton fallback,
    /// or algorithm label.
    #[error("no matching JWKS key for ID token (token kid: {kid:?}, available kids: {available:?})")]
    KeyNotFound {
        kid: Option<String>,
        available: Vec<String>,
    },

    /// Institutional-identity enforcement is enabled and the claims carry no
    /// qualifying linked identity.
    #[error("authentication requires an identity from {0}")]
    IdentityRejected(String),

    /// The claims contain no usable email or institutional identifier.
    #[error("no valid identifier found in claims")]
    MissingIdentifier,

    /// Errors from the `jsonwebtoken` crate during signature or claim verification.
    #[error("JWT validation error: {0}")]
    JwtValidation(#[from] jsonwebtoken::errors::Error),

    /// The algorithm in the token header is not in the configured allow-list.
    #[error("unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The selected key cannot be turned into a decoding key (wrong kty,
    /// missing RSA components).
    #[error("invalid JWK format: {0}")]
    InvalidKeyFormat(String),

    /// A provided URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A required configuration field is missing.
    #[error("a required configuration field is missing: {0}")]
    MissingConfiguration(String),
}
