//! Debounced autosave for the journal editor.
//!
//! Rapid edits coalesce: each [`AutosaveTimer::arm`] call cancels the pending
//! fire and re-schedules with the latest payload, so exactly the state present
//! when the quiet period elapses gets persisted. Disarming (or dropping the
//! timer on editor teardown) guarantees no stale write fires afterwards.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::models::EntryPatch;
use crate::service::DataService;

pub struct AutosaveTimer {
    service: DataService,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveTimer {
    pub fn new(service: DataService, delay: Duration) -> Self {
        Self {
            service,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(service: DataService, config: &Config) -> Self {
        Self::new(service, Duration::from_millis(config.autosave_debounce_ms))
    }

    /// (Re)start the quiet period with a fresh payload. Must be called from
    /// within a tokio runtime.
    pub fn arm(&self, patch: EntryPatch) {
        let service = self.service.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Single attempt: a failed autosave surfaces in the log and the
            // next edit re-arms; no retries.
            if let Err(e) = service.upsert_entry(patch).await {
                tracing::error!(error = %e, "Autosave failed");
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel the pending fire, if any, without persisting.
    pub fn disarm(&self) {
        let handle = self.pending.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for AutosaveTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
