//! Anonymous per-device identifier.
//!
//! Generated once, then immutable for the lifetime of the storage file.
//! Scopes anonymous actions (likes) independently of login state.

use std::fmt;

use anyhow::Result;
use tracing::info;

use crate::storage::{SharedStore, keys};

/// Opaque device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generates a new random identifier (UUID v4, 122 random bits).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier. Blank input yields None.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable holder of this device's identifier.
#[derive(Clone)]
pub struct DeviceIdentity {
    store: SharedStore,
}

impl DeviceIdentity {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Returns the stored identifier without creating one.
    pub fn get(&self) -> Option<DeviceId> {
        self.store
            .get(keys::DEVICE_ID)
            .and_then(|value| DeviceId::parse(&value))
    }

    /// Returns the stored identifier, generating and persisting one on first use.
    ///
    /// # Errors
    /// Returns an error if a newly generated identifier cannot be persisted.
    pub fn get_or_create(&self) -> Result<DeviceId> {
        if let Some(id) = self.get() {
            return Ok(id);
        }

        let id = DeviceId::generate();
        self.store.set(keys::DEVICE_ID, id.as_str())?;
        info!("generated device id");
        Ok(id)
    }
}
