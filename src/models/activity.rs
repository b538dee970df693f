use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A logged activity for a day. Purely descriptive: overlapping time ranges
/// are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub name: String,
    pub category: ActivityCategory,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "activity_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Work,
    Health,
    Social,
    Hobby,
    Other,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 5] = [
        ActivityCategory::Work,
        ActivityCategory::Health,
        ActivityCategory::Social,
        ActivityCategory::Hobby,
        ActivityCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Work => "Work",
            ActivityCategory::Health => "Health",
            ActivityCategory::Social => "Social",
            ActivityCategory::Hobby => "Hobby",
            ActivityCategory::Other => "Other",
        }
    }
}

impl Default for ActivityCategory {
    fn default() -> Self {
        Self::Other
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    #[validate(length(min = 1, message = "Activity name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub category: ActivityCategory,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub note: String,
}
