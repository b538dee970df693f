//! The data access service: the one surface screens talk to.
//!
//! Failure policy: auxiliary reads (entries, tasks, activities) degrade to
//! empty results so a flaky backend renders as "no data" instead of an error
//! screen; writes and the journal upsert propagate so the caller can surface
//! the failure and keep its prior state.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;
use validator::Validate;

use crate::backend::Backend;
use crate::error::AppResult;
use crate::models::{
    Activity, ActivityCategory, EntryPatch, JournalEntry, NewActivity, NewTask, Task, User,
};

#[derive(Clone)]
pub struct DataService {
    backend: Arc<dyn Backend>,
}

/// Count of activities in one category over a date range.
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: ActivityCategory,
    pub count: usize,
}

/// One point of the mood trend: a calendar day and its recorded mood, if any.
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct MoodPoint {
    pub date: NaiveDate,
    pub mood: Option<i16>,
}

impl DataService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Current session user. Never fails: backend errors are logged and read
    /// as "not signed in".
    pub async fn current_user(&self) -> Option<User> {
        match self.backend.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read current user");
                None
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        self.backend.login(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<User> {
        self.backend.sign_up(email, password).await
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.backend.logout().await
    }

    // ------------------------------------------------------------------
    // Journal entries
    // ------------------------------------------------------------------

    /// All entries for a user, newest day first. Degrades to empty on error.
    pub async fn entries(&self, user_id: Uuid) -> Vec<JournalEntry> {
        match self.backend.entries_for_user(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, %user_id, "Failed to load entries");
                Vec::new()
            }
        }
    }

    /// Insert-or-merge the day's entry. Propagates backend errors.
    pub async fn upsert_entry(&self, patch: EntryPatch) -> AppResult<JournalEntry> {
        patch.validate()?;
        self.backend.upsert_entry(patch).await
    }

    /// The entry for a given day, materializing it with defaults on first
    /// touch: a key-only upsert either returns the existing row or creates
    /// one with empty title/content and no mood.
    pub async fn entry_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<JournalEntry> {
        self.backend
            .upsert_entry(EntryPatch::key_only(user_id, date))
            .await
    }

    // ------------------------------------------------------------------
    // Activities
    // ------------------------------------------------------------------

    pub async fn activities(&self, user_id: Uuid, date: NaiveDate) -> Vec<Activity> {
        match self.backend.activities_for_day(user_id, date).await {
            Ok(activities) => activities,
            Err(e) => {
                tracing::error!(error = %e, %user_id, %date, "Failed to load activities");
                Vec::new()
            }
        }
    }

    pub async fn add_activity(&self, new: NewActivity) -> AppResult<Activity> {
        new.validate()?;
        self.backend.insert_activity(new).await
    }

    /// Physical delete; deleting an absent id is a successful no-op.
    pub async fn delete_activity(&self, id: Uuid) -> AppResult<()> {
        self.backend.delete_activity(id).await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn tasks(&self, user_id: Uuid, date: NaiveDate) -> Vec<Task> {
        match self.backend.tasks_for_day(user_id, date).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, %user_id, %date, "Failed to load tasks");
                Vec::new()
            }
        }
    }

    pub async fn add_task(&self, new: NewTask) -> AppResult<Task> {
        new.validate()?;
        self.backend.insert_task(new).await
    }

    /// Flip the completed flag. Read-then-write: two sessions toggling the
    /// same task concurrently can lose one flip; known non-atomic path.
    /// An absent id is a successful no-op.
    pub async fn toggle_task(&self, id: Uuid) -> AppResult<()> {
        match self.backend.task_by_id(id).await? {
            Some(task) => self.backend.set_task_completed(id, !task.completed).await,
            None => Ok(()),
        }
    }

    /// Physical delete; deleting an absent id is a successful no-op.
    pub async fn delete_task(&self, id: Uuid) -> AppResult<()> {
        self.backend.delete_task(id).await
    }

    // ------------------------------------------------------------------
    // Insights
    // ------------------------------------------------------------------

    /// Activity counts per category over `[start, end]`, inclusive, computed
    /// from the stored activities. Categories with no activity are omitted.
    pub async fn category_breakdown(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<CategoryCount>> {
        let mut counts = std::collections::HashMap::new();
        for activity in self.backend.activities_in_range(user_id, start, end).await? {
            *counts.entry(activity.category).or_insert(0usize) += 1;
        }
        let mut breakdown: Vec<CategoryCount> = ActivityCategory::ALL
            .iter()
            .filter_map(|&category| {
                counts.get(&category).map(|&count| CategoryCount { category, count })
            })
            .collect();
        breakdown.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(breakdown)
    }

    /// Recorded mood for each of the last `days` days ending at `end`, one
    /// point per day, `None` where no entry (or no mood) exists.
    pub async fn mood_trend(
        &self,
        user_id: Uuid,
        end: NaiveDate,
        days: u32,
    ) -> AppResult<Vec<MoodPoint>> {
        let entries = self.backend.entries_for_user(user_id).await?;
        let start = end - Duration::days(i64::from(days.saturating_sub(1)));
        let mut trend = Vec::with_capacity(days as usize);
        let mut day = start;
        while day <= end {
            let mood = entries
                .iter()
                .find(|e| e.entry_date == day)
                .and_then(|e| e.mood);
            trend.push(MoodPoint { date: day, mood });
            day += Duration::days(1);
        }
        Ok(trend)
    }
}
