//! Bearer credential storage.
//!
//! The credential is an opaque token. It is set on login and on server-signaled
//! renewal, and cleared on logout or when the server rejects the session.
//! Tokens are never logged or displayed in full.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::{debug, info};

use crate::logging::mask_secret;
use crate::storage::{SharedStore, keys};

/// Durable holder of the current bearer credential.
#[derive(Clone)]
pub struct CredentialStore {
    store: SharedStore,
    /// Serializes renewals so the compare-and-set in [`Self::renew`] is atomic.
    renewal: Arc<Mutex<()>>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            renewal: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the current credential, or None when unauthenticated.
    pub fn get(&self) -> Option<String> {
        self.store
            .get(keys::ACCESS_TOKEN)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    /// Persists a credential; every later pipeline call attaches it.
    ///
    /// # Errors
    /// Returns an error if the credential cannot be persisted.
    pub fn set(&self, token: &str) -> Result<()> {
        debug!(token = %mask_secret(token), "storing credential");
        self.store.set(keys::ACCESS_TOKEN, token.trim())
    }

    /// Removes the credential, refresh cookie and account id.
    /// Returns whether a credential was present.
    ///
    /// # Errors
    /// Returns an error if the removal cannot be persisted.
    pub fn clear(&self) -> Result<bool> {
        let had_token = self.store.remove(keys::ACCESS_TOKEN)?;
        self.store.remove(keys::REFRESH_COOKIE)?;
        self.store.remove(keys::USER_ID)?;
        if had_token {
            info!("credential cleared");
        }
        Ok(had_token)
    }

    /// Applies a server-issued renewal and returns the credential to retry with.
    ///
    /// `sent` is the credential the rejected request carried. When the stored
    /// credential has moved on since then, another request already renewed and
    /// its credential wins; `fresh` is dropped instead of overwriting it.
    ///
    /// # Errors
    /// Returns an error if the renewed credential cannot be persisted.
    pub fn renew(&self, sent: Option<&str>, fresh: &str) -> Result<String> {
        let _guard = self
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = self.get()
            && Some(current.as_str()) != sent
        {
            debug!(
                token = %mask_secret(&current),
                "credential already renewed by a concurrent request"
            );
            return Ok(current);
        }

        info!(token = %mask_secret(fresh), "credential renewed by server");
        self.set(fresh)?;
        Ok(fresh.trim().to_string())
    }

    /// Id of the account the credential belongs to, if known.
    pub fn user_id(&self) -> Option<i64> {
        self.store
            .get(keys::USER_ID)
            .and_then(|id| id.trim().parse().ok())
    }

    /// # Errors
    /// Returns an error if the id cannot be persisted.
    pub fn set_user_id(&self, id: i64) -> Result<()> {
        self.store.set(keys::USER_ID, &id.to_string())
    }

    /// Returns the stored refresh cookie (`name=value`), if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.store.get(keys::REFRESH_COOKIE)
    }

    /// Persists the refresh cookie (`name=value`).
    ///
    /// # Errors
    /// Returns an error if the cookie cannot be persisted.
    pub fn set_refresh_cookie(&self, cookie: &str) -> Result<()> {
        if self.refresh_cookie().as_deref() == Some(cookie) {
            return Ok(());
        }
        debug!("storing refresh cookie");
        self.store.set(keys::REFRESH_COOKIE, cookie)
    }
}
