//! Persistence backends.
//!
//! One capability trait, two implementations: a remote Postgres store and a
//! local single-blob fallback. The choice is made once at startup from
//! configuration; call sites never branch on the backend kind.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Activity, EntryPatch, JournalEntry, NewActivity, NewTask, Task, User};

pub mod local;
pub mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

/// Auth-state change notification, mirrored into the session context.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
}

#[async_trait]
pub trait Backend: Send + Sync {
    // Auth sub-interface
    async fn current_user(&self) -> AppResult<Option<User>>;
    async fn login(&self, email: &str, password: &str) -> AppResult<User>;
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<User>;
    async fn logout(&self) -> AppResult<()>;
    fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent>;

    // Journal entries
    async fn entries_for_user(&self, user_id: Uuid) -> AppResult<Vec<JournalEntry>>;
    /// Insert-or-merge keyed by (user_id, entry_date). Atomic with respect to
    /// the uniqueness invariant: concurrent upserts for the same key must not
    /// produce two rows.
    async fn upsert_entry(&self, patch: EntryPatch) -> AppResult<JournalEntry>;

    // Activities
    async fn activities_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Activity>>;
    async fn activities_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Activity>>;
    async fn insert_activity(&self, new: NewActivity) -> AppResult<Activity>;
    async fn delete_activity(&self, id: Uuid) -> AppResult<()>;

    // Tasks
    async fn tasks_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Task>>;
    async fn insert_task(&self, new: NewTask) -> AppResult<Task>;
    async fn task_by_id(&self, id: Uuid) -> AppResult<Option<Task>>;
    async fn set_task_completed(&self, id: Uuid, completed: bool) -> AppResult<()>;
    async fn delete_task(&self, id: Uuid) -> AppResult<()>;
}

/// Select and initialize the backend from configuration.
pub async fn connect(config: &Config) -> AppResult<Arc<dyn Backend>> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("Using remote Postgres backend");
            Ok(Arc::new(RemoteBackend::connect(url).await?))
        }
        None => {
            tracing::info!(dir = %config.data_dir.display(), "No DATABASE_URL set, using local store");
            Ok(Arc::new(LocalBackend::open(config.data_dir.clone())?))
        }
    }
}
