//! Once-per-day visit ping.
//!
//! The server counts one visit per client per day. The date of the last
//! successful ping lives under the `last_visit` key.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::api::BlogClient;
use crate::storage::{SharedStore, keys};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct VisitTracker {
    store: SharedStore,
}

impl VisitTracker {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Returns the date of the last recorded visit. Unparseable values read as None.
    pub fn last_visit(&self) -> Option<NaiveDate> {
        self.store
            .get(keys::LAST_VISIT)
            .and_then(|value| NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok())
    }

    /// Whether a ping is due on `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.last_visit() != Some(today)
    }

    /// Records a visit on `today`.
    ///
    /// # Errors
    /// Returns an error if the date cannot be persisted.
    pub fn mark(&self, today: NaiveDate) -> Result<()> {
        self.store
            .set(keys::LAST_VISIT, &today.format(DATE_FORMAT).to_string())
    }

    /// Pings the server if no visit was recorded today.
    ///
    /// Failures are logged and swallowed; returns whether a ping was sent successfully.
    pub async fn ping_if_due(&self, client: &BlogClient) -> bool {
        self.ping_on(client, Local::now().date_naive()).await
    }

    pub async fn ping_on(&self, client: &BlogClient, today: NaiveDate) -> bool {
        if !self.is_due(today) {
            debug!(%today, "visit already recorded today");
            return false;
        }

        match client.record_visit().await {
            Ok(()) => {
                if let Err(e) = self.mark(today) {
                    warn!("failed to persist visit date: {e:#}");
                }
                true
            }
            Err(e) => {
                warn!("visit ping failed: {e}");
                false
            }
        }
    }
}
