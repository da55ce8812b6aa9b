// src/identity.rs

use crate::error::AuthError;
use crate::model::UserInfo;
use tracing::{debug, warn};

/// Extracts the username stem from an email-shaped identifier.
///
/// `"cnh@mit.edu"` becomes `"cnh"`; a value with no `@` is returned unchanged.
pub fn username_from_email(email: &str) -> &str {
    match email.split_once('@') {
        Some((stem, _)) => stem,
        None => email,
    }
}

/// Finds the first linked identity whose username ends with the given
/// institutional suffix, returning the full EPPN (e.g. `"cnh@mit.edu"`).
pub fn institution_identity<'a>(claims: &'a UserInfo, suffix: &str) -> Option<&'a str> {
    debug!(
        "Searching for {} identity in {} linked identities",
        suffix,
        claims.identity_set.len()
    );
    claims
        .identity_set
        .iter()
        .filter_map(|identity| identity.username.as_deref())
        .find(|username| username.ends_with(suffix))
}

/// A local identity derived from provider claims, ready for account
/// lookup or provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// The policy for turning provider claims into a local username.
#[derive(Debug, Clone)]
pub enum IdentityPolicy {
    /// Username is the stem of the `email` claim. Suitable for standard
    /// providers (Okta, Keycloak, Azure AD).
    Direct,
    /// Username is derived from the linked identity in `identity_set` whose
    /// EPPN ends with `suffix`, falling back to `preferred_username` and then
    /// `email`. With `required` set, authentication fails outright when no
    /// such identity is linked, even if a fallback identifier exists.
    InstitutionScoped { suffix: String, required: bool },
}

impl IdentityPolicy {
    /// Resolves claims into a local identity.
    ///
    /// Fails with `IdentityRejected` when institutional enforcement is on and
    /// no qualifying identity is linked, and with `MissingIdentifier` when no
    /// usable email or EPPN is present. Both happen before any account is
    /// touched.
    pub fn resolve(&self, claims: &UserInfo) -> Result<ResolvedIdentity, AuthError> {
        let (username, email) = match self {
            IdentityPolicy::Direct => {
                let email = claims
                    .email
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .ok_or(AuthError::MissingIdentifier)?;
                (username_from_email(email).to_string(), email.to_string())
            }
            IdentityPolicy::InstitutionScoped { suffix, required } => {
                let eppn = institution_identity(claims, suffix);
                if *required && eppn.is_none() {
                    warn!("No {} identity found in identity_set", suffix);
                    return Err(AuthError::IdentityRejected(suffix.clone()));
                }
                // Fall back to preferred_username, then email.
                let identifier = eppn
                    .or(claims.preferred_username.as_deref())
                    .or(claims.email.as_deref())
                    .filter(|id| !id.is_empty());

                // The email claim wins for the account's address; the
                // identifier stands in when the claim is absent.
                let email = claims
                    .email
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .or(identifier);

                match (identifier, email) {
                    (Some(id), Some(email)) if id.contains('@') => {
                        (username_from_email(id).to_string(), email.to_string())
                    }
                    (_, Some(email)) => {
                        (username_from_email(email).to_string(), email.to_string())
                    }
                    _ => {
                        return Err(AuthError::MissingIdentifier);
                    }
                }
            }
        };

        let (first_name, last_name) = display_names(claims);
        debug!("Resolved identity: username={}, email={}", username, email);
        Ok(ResolvedIdentity {
            username,
            email,
            first_name,
            last_name,
        })
    }
}

/// Derives first/last name from claims: `given_name`/`family_name` when
/// present, otherwise the `name` claim split on the first space.
fn display_names(claims: &UserInfo) -> (String, String) {
    let first = claims.given_name.clone().unwrap_or_default();
    let last = claims.family_name.clone().unwrap_or_default();
    if first.is_empty() {
        if let Some(name) = claims.name.as_deref() {
            return match name.split_once(' ') {
                Some((given, family)) => (given.to_string(), family.to_string()),
                None => (name.to_string(), last),
            };
        }
    }
    (first, last)
}
