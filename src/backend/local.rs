use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Activity, EntryPatch, JournalEntry, NewActivity, NewTask, Task, User};

use super::{AuthEvent, Backend};

/// File name of the serialized store. The version suffix is the only schema
/// versioning the blob carries.
const STORE_FILE: &str = "serene_daily_db_v2.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreBlob {
    user: Option<User>,
    entries: Vec<JournalEntry>,
    activities: Vec<Activity>,
    tasks: Vec<Task>,
}

/// Offline fallback: the whole store is one JSON blob, read fully into
/// memory on every operation, mutated, and written back fully. A single
/// writer is assumed; the mutex enforces it within this process, which is
/// what makes the linear-scan upsert safe.
pub struct LocalBackend {
    path: PathBuf,
    lock: Mutex<()>,
    auth_tx: broadcast::Sender<AuthEvent>,
}

impl LocalBackend {
    pub fn open(data_dir: PathBuf) -> AppResult<Self> {
        fs::create_dir_all(&data_dir)?;
        let (auth_tx, _) = broadcast::channel(16);
        Ok(Self {
            path: data_dir.join(STORE_FILE),
            lock: Mutex::new(()),
            auth_tx,
        })
    }

    fn load(&self) -> StoreBlob {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoreBlob::default(),
            Err(e) => {
                tracing::error!(error = %e, path = %self.path.display(), "Failed to read store");
                return StoreBlob::default();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!(error = %e, "Store blob is corrupt, starting empty");
                StoreBlob::default()
            }
        }
    }

    fn save(&self, blob: &StoreBlob) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(blob)
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn current_user(&self) -> AppResult<Option<User>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().user)
    }

    async fn login(&self, email: &str, _password: &str) -> AppResult<User> {
        // The fallback store keeps no credentials: logging in adopts the
        // stored user when the email matches, otherwise starts a fresh one.
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        let user = match blob.user.take().filter(|u| u.email == email) {
            Some(user) => user,
            None => User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                onboarded: true,
                created_at: Utc::now(),
            },
        };
        blob.user = Some(user.clone());
        self.save(&blob)?;
        let _ = self.auth_tx.send(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<User> {
        if email.is_empty() || password.len() < 8 {
            return Err(AppError::Validation(
                "Email required and password must be at least 8 characters".into(),
            ));
        }
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        if blob.user.as_ref().is_some_and(|u| u.email == email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            onboarded: true,
            created_at: Utc::now(),
        };
        blob.user = Some(user.clone());
        self.save(&blob)?;
        let _ = self.auth_tx.send(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn logout(&self) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        blob.user = None;
        // Logout always succeeds from the caller's point of view; a failed
        // write only means the stored user outlives this process.
        if let Err(e) = self.save(&blob) {
            tracing::error!(error = %e, "Failed to persist logout");
        }
        let _ = self.auth_tx.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    async fn entries_for_user(&self, user_id: Uuid) -> AppResult<Vec<JournalEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries: Vec<JournalEntry> = self
            .load()
            .entries
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    async fn upsert_entry(&self, patch: EntryPatch) -> AppResult<JournalEntry> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        let now = Utc::now();

        let entry = match blob
            .entries
            .iter_mut()
            .find(|e| e.user_id == patch.user_id && e.entry_date == patch.entry_date)
        {
            Some(existing) => {
                if let Some(title) = patch.title {
                    existing.title = title;
                }
                if let Some(content) = patch.content {
                    existing.content = content;
                }
                if let Some(mood) = patch.mood {
                    existing.mood = Some(mood);
                }
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let entry = JournalEntry {
                    id: Uuid::new_v4(),
                    user_id: patch.user_id,
                    entry_date: patch.entry_date,
                    title: patch.title.unwrap_or_default(),
                    content: patch.content.unwrap_or_default(),
                    mood: patch.mood,
                    created_at: now,
                    updated_at: now,
                };
                blob.entries.push(entry.clone());
                entry
            }
        };

        self.save(&blob)?;
        Ok(entry)
    }

    async fn activities_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Activity>> {
        let _guard = self.lock.lock().await;
        let mut activities: Vec<Activity> = self
            .load()
            .activities
            .into_iter()
            .filter(|a| a.user_id == user_id && a.entry_date == date)
            .collect();
        activities.sort_by_key(|a| a.start_time);
        Ok(activities)
    }

    async fn activities_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Activity>> {
        let _guard = self.lock.lock().await;
        let mut activities: Vec<Activity> = self
            .load()
            .activities
            .into_iter()
            .filter(|a| a.user_id == user_id && a.entry_date >= start && a.entry_date <= end)
            .collect();
        activities.sort_by_key(|a| (a.entry_date, a.start_time));
        Ok(activities)
    }

    async fn insert_activity(&self, new: NewActivity) -> AppResult<Activity> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        let activity = Activity {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            entry_date: new.entry_date,
            name: new.name,
            category: new.category,
            start_time: new.start_time,
            end_time: new.end_time,
            note: new.note,
            created_at: Utc::now(),
        };
        blob.activities.push(activity.clone());
        self.save(&blob)?;
        Ok(activity)
    }

    async fn delete_activity(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        blob.activities.retain(|a| a.id != id);
        self.save(&blob)?;
        Ok(())
    }

    async fn tasks_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Task>> {
        let _guard = self.lock.lock().await;
        let mut tasks: Vec<Task> = self
            .load()
            .tasks
            .into_iter()
            .filter(|t| t.user_id == user_id && t.entry_date == date)
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn insert_task(&self, new: NewTask) -> AppResult<Task> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            entry_date: new.entry_date,
            title: new.title,
            completed: new.completed,
            priority: new.priority,
            created_at: Utc::now(),
        };
        blob.tasks.push(task.clone());
        self.save(&blob)?;
        Ok(task)
    }

    async fn task_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().tasks.into_iter().find(|t| t.id == id))
    }

    async fn set_task_completed(&self, id: Uuid, completed: bool) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        if let Some(task) = blob.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = completed;
            self.save(&blob)?;
        }
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut blob = self.load();
        blob.tasks.retain(|t| t.id != id);
        self.save(&blob)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::open(dir.path().to_path_buf()).unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn missing_blob_reads_as_empty_store() {
        let (_dir, backend) = backend();
        assert!(backend.current_user().await.unwrap().is_none());
        assert!(backend
            .entries_for_user(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_degrades_to_empty_store() {
        let (dir, backend) = backend();
        fs::write(dir.path().join(STORE_FILE), b"{not json").unwrap();
        assert!(backend.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let user = {
            let backend = LocalBackend::open(dir.path().to_path_buf()).unwrap();
            backend.login("a@x.com", "irrelevant").await.unwrap()
        };
        let backend = LocalBackend::open(dir.path().to_path_buf()).unwrap();
        let restored = backend.current_user().await.unwrap().unwrap();
        assert_eq!(restored.id, user.id);
        assert_eq!(restored.email, "a@x.com");
        assert!(restored.onboarded);
    }

    #[tokio::test]
    async fn login_with_same_email_keeps_identity() {
        let (_dir, backend) = backend();
        let first = backend.login("a@x.com", "pw").await.unwrap();
        backend.logout().await.unwrap();
        let second = backend.login("a@x.com", "pw").await.unwrap();
        // Logout clears the stored user, so a new identity is issued.
        assert_ne!(first.id, second.id);

        let third = backend.login("a@x.com", "pw").await.unwrap();
        assert_eq!(second.id, third.id);
    }

    #[tokio::test]
    async fn sign_up_rejects_registered_email() {
        let (_dir, backend) = backend();
        backend.sign_up("a@x.com", "longenough").await.unwrap();
        let err = backend.sign_up("a@x.com", "longenough").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
