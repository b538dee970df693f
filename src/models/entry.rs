use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One journal entry per user per calendar day. The (user_id, entry_date)
/// pair is unique; rows are materialized lazily on first touch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub title: String,
    pub content: String,
    pub mood: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update keyed by (user_id, entry_date). Fields left as `None` are
/// preserved on an existing row, never cleared.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EntryPatch {
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood: Option<i16>,
}

impl EntryPatch {
    /// A patch carrying only the key fields; upserting it materializes the
    /// day's row with defaults if it does not exist yet.
    pub fn key_only(user_id: Uuid, entry_date: NaiveDate) -> Self {
        Self {
            user_id,
            entry_date,
            title: None,
            content: None,
            mood: None,
        }
    }
}
