//! Shared state for command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use quill_core::api::BlogClient;
use quill_core::config::Config;
use quill_core::session::{CredentialStore, DeviceId, DeviceIdentity, VisitTracker};
use quill_core::storage::{FileStore, SharedStore};
use tracing::warn;

/// Config, durable storage, and an API client over them.
pub struct AppContext {
    pub config: Config,
    pub store: SharedStore,
    pub client: BlogClient,
}

impl AppContext {
    pub fn open(config: Config) -> Result<Self> {
        let store: SharedStore = Arc::new(FileStore::open_default().context("open storage")?);
        let client = BlogClient::from_config(&config, Arc::clone(&store))?;
        Ok(Self {
            config,
            store,
            client,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.client.credentials()
    }

    pub fn device_identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(Arc::clone(&self.store))
    }

    /// This device's id, created on first use. None if it cannot be persisted.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.device_identity()
            .get_or_create()
            .inspect_err(|e| warn!("device id unavailable: {e:#}"))
            .ok()
    }

    pub fn visits(&self) -> VisitTracker {
        VisitTracker::new(Arc::clone(&self.store))
    }
}
