// src/backend.rs

use crate::error::AuthError;
use crate::identity::{IdentityPolicy, ResolvedIdentity};
use crate::model::UserInfo;
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::{debug, info};

/// A local user account, as seen by the authentication pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

/// The seam to the host application's account storage.
///
/// The library owns the lookup/provision pipeline but not persistence;
/// implement this trait over whatever the host uses to store accounts.
pub trait UserStore {
    fn find_by_username(&self, username: &str) -> Option<UserRecord>;
    fn find_by_email(&self, email: &str) -> Option<UserRecord>;
    fn insert(&mut self, user: UserRecord);
    fn update(&mut self, user: &UserRecord);

    /// Ensures an application profile exists for the user, returning `true`
    /// if one was newly created.
    fn ensure_profile(&mut self, username: &str) -> bool;

    /// Whether this store can hold application profiles at all. Stores
    /// without profile support disable profile creation; that is a
    /// capability, not an error.
    fn supports_profiles(&self) -> bool {
        true
    }
}

/// An in-memory `UserStore`, keyed by username.
///
/// The reference implementation, also used throughout the test suite.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: HashMap<String, UserRecord>,
    profiles: HashSet<String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_profile(&self, username: &str) -> bool {
        self.profiles.contains(username)
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users.values().find(|u| u.email == email).cloned()
    }

    fn insert(&mut self, user: UserRecord) {
        self.users.insert(user.username.clone(), user);
    }

    fn update(&mut self, user: &UserRecord) {
        self.users.insert(user.username.clone(), user.clone());
    }

    fn ensure_profile(&mut self, username: &str) -> bool {
        self.profiles.insert(username.to_string())
    }
}

/// The account side of an OIDC login: resolves claims to a local identity,
/// then finds, updates, or provisions the matching account.
pub struct AuthBackend<S> {
    store: S,
    policy: IdentityPolicy,
    // Snapshotted once at construction; profile paths consult the flag
    // rather than re-probing the store.
    profiles_enabled: bool,
}

impl<S: UserStore> AuthBackend<S> {
    pub fn new(store: S, policy: IdentityPolicy) -> Self {
        let profiles_enabled = store.supports_profiles();
        if !profiles_enabled {
            debug!("User store has no profile support; profile creation disabled");
        }
        Self {
            store,
            policy,
            profiles_enabled,
        }
    }

    /// Finds an existing account for the resolved identity.
    ///
    /// Tries the derived username first, then an exact email match; the
    /// first hit wins.
    pub fn find_user(&self, identity: &ResolvedIdentity) -> Option<UserRecord> {
        if let Some(user) = self.store.find_by_username(&identity.username) {
            debug!("Found user by derived username: {}", identity.username);
            return Some(user);
        }
        if let Some(user) = self.store.find_by_email(&identity.email) {
            debug!("Found user by email: {}", identity.email);
            return Some(user);
        }
        debug!("No existing user found for email={}", identity.email);
        None
    }

    /// Authenticates a set of userinfo claims against the store.
    ///
    /// Identity resolution failures (`IdentityRejected`, `MissingIdentifier`)
    /// abort before any account is created or updated.
    pub fn authenticate(&mut self, claims: &UserInfo) -> Result<UserRecord, AuthError> {
        let identity = self.policy.resolve(claims)?;

        let user = match self.find_user(&identity) {
            Some(existing) => self.update_user(existing, &identity),
            None => self.create_user(&identity),
        };

        if self.profiles_enabled {
            let created = self.store.ensure_profile(&user.username);
            debug!(
                "Profile {} for {}",
                if created { "created" } else { "already exists" },
                user.username
            );
        }

        Ok(user)
    }

    /// Provisions a new account from the resolved identity.
    fn create_user(&mut self, identity: &ResolvedIdentity) -> UserRecord {
        info!(
            "Creating new user: username={}, email={}",
            identity.username, identity.email
        );
        let user = UserRecord {
            username: identity.username.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            active: true,
        };
        self.store.insert(user.clone());
        user
    }

    /// Syncs an existing account on a repeat login: reactivates it and
    /// refreshes names from the current claims.
    fn update_user(&mut self, mut user: UserRecord, identity: &ResolvedIdentity) -> UserRecord {
        debug!("Updating user: {}", user.username);
        user.active = true;
        if !identity.first_name.is_empty() {
            user.first_name = identity.first_name.clone();
        }
        if !identity.last_name.is_empty() {
            user.last_name = identity.last_name.clone();
        }
        self.store.update(&user);
        user
    }
}
