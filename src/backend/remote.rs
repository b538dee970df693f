use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{
    Activity, EntryPatch, JournalEntry, NewActivity, NewTask, Task, User, UserAccount,
};

use super::{AuthEvent, Backend};

/// Remote Postgres backend. The uniqueness of (user_id, entry_date) is
/// enforced by a database constraint and a native ON CONFLICT upsert, never
/// by a read-then-write sequence on this side.
///
/// The authenticated identity is a client-side session: it lives in this
/// process and is mirrored over the auth event channel, the database only
/// stores accounts.
pub struct RemoteBackend {
    pool: PgPool,
    session: RwLock<Option<User>>,
    auth_tx: broadcast::Sender<AuthEvent>,
}

impl RemoteBackend {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        tracing::info!("Database migrations applied");

        let (auth_tx, _) = broadcast::channel(16);
        Ok(Self {
            pool,
            session: RwLock::new(None),
            auth_tx,
        })
    }

    async fn replace_session(&self, user: Option<User>) {
        let event = match &user {
            Some(u) => AuthEvent::SignedIn(u.clone()),
            None => AuthEvent::SignedOut,
        };
        *self.session.write().await = user;
        // Nobody listening is fine; the session context may not be up yet.
        let _ = self.auth_tx.send(event);
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn current_user(&self) -> AppResult<Option<User>> {
        Ok(self.session.read().await.clone())
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let account = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let stored_hash = account.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
        if !verify_password(password, stored_hash)? {
            return Err(AppError::Unauthorized);
        }

        let user = User::from(account);
        self.replace_session(Some(user.clone())).await;
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<User> {
        if email.is_empty() || password.len() < 8 {
            return Err(AppError::Validation(
                "Email required and password must be at least 8 characters".into(),
            ));
        }

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let pwd_hash = hash_password(password)?;
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&pwd_hash)
        .fetch_one(&self.pool)
        .await?;

        let user = User::from(account);
        self.replace_session(Some(user.clone())).await;
        Ok(user)
    }

    async fn logout(&self) -> AppResult<()> {
        // The session is purely client-side, so clearing it cannot fail and
        // repeated logouts are a no-op.
        self.replace_session(None).await;
        Ok(())
    }

    fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    async fn entries_for_user(&self, user_id: Uuid) -> AppResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE user_id = $1
            ORDER BY entry_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn upsert_entry(&self, patch: EntryPatch) -> AppResult<JournalEntry> {
        // COALESCE keeps fields absent from the patch untouched on the update
        // arm; the insert arm materializes the documented defaults.
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries (id, user_id, entry_date, title, content, mood)
            VALUES ($1, $2, $3, COALESCE($4, ''), COALESCE($5, ''), $6)
            ON CONFLICT (user_id, entry_date) DO UPDATE SET
                title = COALESCE($4, journal_entries.title),
                content = COALESCE($5, journal_entries.content),
                mood = COALESCE($6, journal_entries.mood),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patch.user_id)
        .bind(patch.entry_date)
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(patch.mood)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn activities_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE user_id = $1 AND entry_date = $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    async fn activities_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE user_id = $1 AND entry_date BETWEEN $2 AND $3
            ORDER BY entry_date ASC, start_time ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    async fn insert_activity(&self, new: NewActivity) -> AppResult<Activity> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (id, user_id, entry_date, name, category, start_time, end_time, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.entry_date)
        .bind(&new.name)
        .bind(new.category)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.note)
        .fetch_one(&self.pool)
        .await?;
        Ok(activity)
    }

    async fn delete_activity(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tasks_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE user_id = $1 AND entry_date = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn insert_task(&self, new: NewTask) -> AppResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, user_id, entry_date, title, completed, priority)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.entry_date)
        .bind(&new.title)
        .bind(new.completed)
        .bind(new.priority)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn task_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn set_task_completed(&self, id: Uuid, completed: bool) -> AppResult<()> {
        sqlx::query("UPDATE tasks SET completed = $2 WHERE id = $1")
            .bind(id)
            .bind(completed)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
