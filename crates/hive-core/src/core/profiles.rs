//! User profile operations: moderation flags and delivery tokens.

use tracing::debug;

use super::{decode, encode, CoreError, CoreResult};
use crate::model::{user_path, UserProfile};
use crate::store::DocumentStore;

/// Service for reading and updating user profiles.
pub struct ProfileService<'a> {
    store: &'a DocumentStore,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Load a profile, creating it with default flags on first contact.
    pub fn ensure(&self, user_id: &str) -> CoreResult<UserProfile> {
        let path = user_path(user_id);
        self.store.in_transaction(|txn| {
            if let Some(value) = txn.get(&path)? {
                return decode(&path, value);
            }
            let profile = UserProfile::default();
            txn.set(&path, &encode(&profile)?)?;
            debug!(user_id, "created default profile");
            Ok(profile)
        })
    }

    /// Load a profile; errors if the user has never been seen.
    pub fn get(&self, user_id: &str) -> CoreResult<UserProfile> {
        let path = user_path(user_id);
        let value = self
            .store
            .get(&path)?
            .ok_or_else(|| CoreError::not_found(&path))?;
        decode(&path, value)
    }

    /// Register a delivery token for the user.
    ///
    /// Set semantics: re-registering a known token writes nothing, so
    /// it produces no change record. Returns whether the token was new.
    pub fn register_token(&self, user_id: &str, token: &str) -> CoreResult<bool> {
        let path = user_path(user_id);
        self.store.in_transaction(|txn| {
            let mut profile: UserProfile = match txn.get(&path)? {
                Some(value) => decode(&path, value)?,
                None => UserProfile::default(),
            };
            if profile.fcm_tokens.iter().any(|t| t == token) {
                return Ok(false);
            }
            profile.fcm_tokens.push(token.to_string());
            txn.set(&path, &encode(&profile)?)?;
            Ok(true)
        })
    }

    /// Grant or revoke the admin flag.
    pub fn set_admin(&self, user_id: &str, is_admin: bool) -> CoreResult<()> {
        let path = user_path(user_id);
        self.store.in_transaction(|txn| {
            let mut profile: UserProfile = match txn.get(&path)? {
                Some(value) => decode(&path, value)?,
                None => UserProfile::default(),
            };
            if profile.is_admin == is_admin {
                return Ok(());
            }
            profile.is_admin = is_admin;
            txn.set(&path, &encode(&profile)?)?;
            debug!(user_id, is_admin, "updated admin flag");
            Ok(())
        })
    }
}
