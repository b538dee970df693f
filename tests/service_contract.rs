//! Contract tests for the data access service over the local store.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use serene_core::backend::LocalBackend;
use serene_core::models::{ActivityCategory, EntryPatch, NewActivity, NewTask, TaskPriority};
use serene_core::{AppError, DataService};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn service() -> (tempfile::TempDir, DataService) {
    let dir = tempfile::tempdir().unwrap();
    let backend = LocalBackend::open(dir.path().to_path_buf()).unwrap();
    (dir, DataService::new(Arc::new(backend)))
}

#[tokio::test]
async fn repeated_upserts_keep_one_row_with_a_stable_id() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-01-01");

    let first = service
        .upsert_entry(EntryPatch::key_only(user_id, day))
        .await
        .unwrap();

    for mood in 1..=5i16 {
        let again = service
            .upsert_entry(EntryPatch {
                mood: Some(mood),
                ..EntryPatch::key_only(user_id, day)
            })
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
    }

    let entries = service.entries(user_id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mood, Some(5));
}

#[tokio::test]
async fn upsert_merges_without_clearing_absent_fields() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-03-10");

    service
        .upsert_entry(EntryPatch {
            mood: Some(4),
            ..EntryPatch::key_only(user_id, day)
        })
        .await
        .unwrap();

    let merged = service
        .upsert_entry(EntryPatch {
            title: Some("T".into()),
            ..EntryPatch::key_only(user_id, day)
        })
        .await
        .unwrap();

    assert_eq!(merged.mood, Some(4));
    assert_eq!(merged.title, "T");
    assert_eq!(merged.content, "");
}

#[tokio::test]
async fn first_upsert_materializes_defaults() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();

    let entry = service
        .upsert_entry(EntryPatch::key_only(user_id, date("2024-02-02")))
        .await
        .unwrap();

    assert_eq!(entry.title, "");
    assert_eq!(entry.content, "");
    assert_eq!(entry.mood, None);
    assert_eq!(entry.created_at, entry.updated_at);
}

#[tokio::test]
async fn entry_for_day_creates_then_returns_the_same_row() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-06-01");

    let first = service.entry_for_day(user_id, day).await.unwrap();

    service
        .upsert_entry(EntryPatch {
            content: Some("walked the long way home".into()),
            ..EntryPatch::key_only(user_id, day)
        })
        .await
        .unwrap();

    let second = service.entry_for_day(user_id, day).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.content, "walked the long way home");
}

#[tokio::test]
async fn mood_out_of_range_is_rejected_before_the_backend() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();

    let err = service
        .upsert_entry(EntryPatch {
            mood: Some(6),
            ..EntryPatch::key_only(user_id, date("2024-01-01"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(service.entries(user_id).await.is_empty());
}

#[tokio::test]
async fn entries_come_back_newest_day_first() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();

    for day in ["2024-01-02", "2024-01-05", "2024-01-03"] {
        service
            .upsert_entry(EntryPatch::key_only(user_id, date(day)))
            .await
            .unwrap();
    }

    let dates: Vec<NaiveDate> = service
        .entries(user_id)
        .await
        .into_iter()
        .map(|e| e.entry_date)
        .collect();
    assert_eq!(
        dates,
        vec![date("2024-01-05"), date("2024-01-03"), date("2024-01-02")]
    );
}

#[tokio::test]
async fn deleting_an_absent_task_is_a_no_op() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-01-01");

    let task = service
        .add_task(NewTask {
            user_id,
            entry_date: day,
            title: "Stretch".into(),
            completed: false,
            priority: TaskPriority::Low,
        })
        .await
        .unwrap();

    service.delete_task(Uuid::new_v4()).await.unwrap();

    let tasks = service.tasks(user_id, day).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task.id);
}

#[tokio::test]
async fn toggle_flips_and_flips_back() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-01-01");

    let task = service
        .add_task(NewTask {
            user_id,
            entry_date: day,
            title: "Water the plants".into(),
            completed: false,
            priority: TaskPriority::Medium,
        })
        .await
        .unwrap();

    service.toggle_task(task.id).await.unwrap();
    assert!(service.tasks(user_id, day).await[0].completed);

    service.toggle_task(task.id).await.unwrap();
    assert!(!service.tasks(user_id, day).await[0].completed);

    // Toggling an id that does not exist is success, not an error.
    service.toggle_task(Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn tasks_are_ordered_by_creation() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-01-01");

    for title in ["first", "second", "third"] {
        service
            .add_task(NewTask {
                user_id,
                entry_date: day,
                title: title.into(),
                completed: false,
                priority: TaskPriority::Medium,
            })
            .await
            .unwrap();
    }

    let titles: Vec<String> = service
        .tasks(user_id, day)
        .await
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn activities_round_trip_and_delete() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();
    let day = date("2024-01-01");

    let activity = service
        .add_activity(NewActivity {
            user_id,
            entry_date: day,
            name: "Gym".into(),
            category: ActivityCategory::Health,
            start_time: "18:00:00".parse().unwrap(),
            end_time: "19:00:00".parse().unwrap(),
            note: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(service.activities(user_id, day).await.len(), 1);

    service.delete_activity(activity.id).await.unwrap();
    assert!(service.activities(user_id, day).await.is_empty());

    // Deleting again is still success.
    service.delete_activity(activity.id).await.unwrap();
}

#[tokio::test]
async fn login_upsert_and_task_scenario() {
    let (_dir, service) = service();

    let user = service.login("a@x.com", "pw").await.unwrap();
    let current = service.current_user().await.unwrap();
    assert_eq!(current.email, "a@x.com");
    assert!(current.onboarded);

    service
        .upsert_entry(EntryPatch {
            mood: Some(5),
            ..EntryPatch::key_only(user.id, date("2024-01-01"))
        })
        .await
        .unwrap();

    let entries = service.entries(user.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_date, date("2024-01-01"));
    assert_eq!(entries[0].mood, Some(5));

    let task = service
        .add_task(NewTask {
            user_id: user.id,
            entry_date: date("2024-01-01"),
            title: "Walk".into(),
            completed: false,
            priority: TaskPriority::Medium,
        })
        .await
        .unwrap();
    service.toggle_task(task.id).await.unwrap();

    let tasks = service.tasks(user.id, date("2024-01-01")).await;
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].completed);
}

#[tokio::test]
async fn category_breakdown_counts_stored_activities() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();

    let add = |day: &str, category: ActivityCategory| {
        let day = date(day);
        let service = service.clone();
        async move {
            service
                .add_activity(NewActivity {
                    user_id,
                    entry_date: day,
                    name: "something".into(),
                    category,
                    start_time: "09:00:00".parse().unwrap(),
                    end_time: "10:00:00".parse().unwrap(),
                    note: String::new(),
                })
                .await
                .unwrap()
        }
    };

    add("2024-01-01", ActivityCategory::Work).await;
    add("2024-01-02", ActivityCategory::Work).await;
    add("2024-01-03", ActivityCategory::Health).await;
    // Outside the queried range.
    add("2024-02-01", ActivityCategory::Social).await;

    let breakdown = service
        .category_breakdown(user_id, date("2024-01-01"), date("2024-01-31"))
        .await
        .unwrap();

    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].category, ActivityCategory::Work);
    assert_eq!(breakdown[0].count, 2);
    assert_eq!(breakdown[1].category, ActivityCategory::Health);
    assert_eq!(breakdown[1].count, 1);
}

#[tokio::test]
async fn mood_trend_has_one_point_per_day() {
    let (_dir, service) = service();
    let user_id = Uuid::new_v4();

    service
        .upsert_entry(EntryPatch {
            mood: Some(3),
            ..EntryPatch::key_only(user_id, date("2024-01-05"))
        })
        .await
        .unwrap();
    service
        .upsert_entry(EntryPatch::key_only(user_id, date("2024-01-06")))
        .await
        .unwrap();

    let trend = service
        .mood_trend(user_id, date("2024-01-07"), 7)
        .await
        .unwrap();

    assert_eq!(trend.len(), 7);
    assert_eq!(trend[0].date, date("2024-01-01"));
    assert_eq!(trend[4].mood, Some(3));
    // An entry without a recorded mood still reads as no mood.
    assert_eq!(trend[5].mood, None);
    assert_eq!(trend[6].mood, None);
}
