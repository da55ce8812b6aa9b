// src/config.rs

use crate::error::AuthError;
use crate::identity::IdentityPolicy;
use jsonwebtoken::Algorithm;
use std::time::Duration;
use url::Url;

/// Contains the validation settings for an OIDC ID token.
#[derive(Clone)]
pub struct ValidationDetails {
    /// The signing algorithms that are permitted for the ID token.
    /// Tokens signed with any other algorithm will be rejected.
    pub algorithms: Vec<Algorithm>,
    /// The tolerance for clock skew when validating time-based claims like
    /// `exp` and `iat`. Defaults to 60 seconds.
    pub leeway: Duration,
}

impl Default for ValidationDetails {
    fn default() -> Self {
        Self {
            // Globus labels its keys RS256 but signs ID tokens with RS512,
            // so both must be permitted by default.
            algorithms: vec![Algorithm::RS256, Algorithm::RS512],
            leeway: Duration::from_secs(60),
        }
    }
}

/// The main configuration for the `globus-oidc` validator and backend.
///
/// This struct holds all necessary information to reach the provider's JWKS
/// endpoint, validate tokens, and resolve local identities. It should be
/// constructed using the `ConfigBuilder`.
#[derive(Clone)]
pub struct Config {
    /// The issuer URL of the OIDC provider, used to validate the `iss` claim.
    pub issuer_url: Url,
    /// The client ID of the application, as registered with the OIDC provider.
    /// This is used to validate the `aud` claim of the ID token.
    pub client_id: String,
    /// The provider's published JWKS endpoint. Keys are fetched fresh from
    /// here on every validation attempt.
    pub jwks_url: Url,
    /// Timeout for the JWKS fetch. Defaults to 10 seconds.
    pub fetch_timeout: Duration,
    /// The specific validation parameters to apply to the token.
    pub validation: ValidationDetails,
    /// The policy for deriving a local username from claims.
    pub identity: IdentityPolicy,
}

/// A builder for creating a `Config` instance.
///
/// This builder provides a fluent API to ensure that the configuration is
/// constructed correctly and with all required fields.
#[derive(Default)]
pub struct ConfigBuilder {
    issuer_url: Option<Url>,
    client_id: Option<String>,
    jwks_url: Option<Url>,
    fetch_timeout: Option<Duration>,
    validation: ValidationDetails,
    institution_suffix: Option<String>,
    require_institution: bool,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issuer URL of the OIDC provider. This is a required field.
    ///
    /// # Arguments
    ///
    /// * `url` - The issuer URL, e.g., "https://auth.globus.org".
    pub fn issuer_url(mut self, url: &str) -> Result<Self, AuthError> {
        let parsed_url = Url::parse(url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        self.issuer_url = Some(parsed_url);
        Ok(self)
    }

    /// Sets the client ID of the application. This is a required field.
    pub fn client_id(mut self, client_id: String) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the provider's JWKS endpoint URL. This is a required field:
    /// the library performs no discovery round-trip.
    pub fn jwks_url(mut self, url: &str) -> Result<Self, AuthError> {
        let parsed_url = Url::parse(url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        self.jwks_url = Some(parsed_url);
        Ok(self)
    }

    /// Sets the timeout for the JWKS fetch. This is optional.
    /// Defaults to 10 seconds.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the allowed signing algorithms.
    /// Defaults to `[Algorithm::RS256, Algorithm::RS512]` if not set.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.validation.algorithms = algorithms;
        self
    }

    /// Sets the clock skew tolerance. This is optional.
    /// Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway;
        self
    }

    /// Switches identity resolution to the institution-scoped policy: the
    /// username is derived from the linked identity whose EPPN ends with
    /// `suffix` (e.g. "@mit.edu") rather than from the `email` claim.
    pub fn institution_suffix(mut self, suffix: &str) -> Self {
        self.institution_suffix = Some(suffix.to_string());
        self
    }

    /// When enabled, authentication is rejected outright if the claims carry
    /// no linked identity matching the institution suffix, even if a usable
    /// fallback identifier is present. Has no effect unless
    /// `institution_suffix` is also set.
    pub fn require_institution(mut self, required: bool) -> Self {
        self.require_institution = required;
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields (`issuer_url`, `client_id`,
    /// `jwks_url`) are missing.
    pub fn build(self) -> Result<Config, AuthError> {
        let issuer_url = self
            .issuer_url
            .ok_or(AuthError::MissingConfiguration("issuer_url".to_string()))?;
        let client_id = self
            .client_id
            .ok_or(AuthError::MissingConfiguration("client_id".to_string()))?;
        let jwks_url = self
            .jwks_url
            .ok_or(AuthError::MissingConfiguration("jwks_url".to_string()))?;

        let identity = match self.institution_suffix {
            Some(suffix) => IdentityPolicy::InstitutionScoped {
                suffix,
                required: self.require_institution,
            },
            None => IdentityPolicy::Direct,
        };

        Ok(Config {
            issuer_url,
            client_id,
            jwks_url,
            fetch_timeout: self
                .fetch_timeout
                .unwrap_or_else(|| Duration::from_secs(10)),
            validation: self.validation,
            identity,
        })
    }
}
