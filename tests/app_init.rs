//! Startup wiring: backend selection from configuration.

use std::time::Duration;

use serene_core::{App, Config};

#[tokio::test]
async fn no_database_url_selects_the_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: None,
        data_dir: dir.path().to_path_buf(),
        autosave_debounce_ms: 25,
    };

    let app = App::with_config(config).await.unwrap();

    // The session synced against an empty store.
    assert!(!app.session.is_loading());
    assert!(app.session.user().is_none());

    // Login flows through the service and reaches the session listener.
    let user = app.service.login("a@x.com", "pw").await.unwrap();
    for _ in 0..200 {
        if app.session.user().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.session.user().unwrap().id, user.id);

    // The autosave timer picks up the configured quiet period.
    let timer = app.autosave();
    timer.arm(serene_core::models::EntryPatch::key_only(
        user.id,
        "2024-01-01".parse().unwrap(),
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.service.entries(user.id).await.len(), 1);

    app.shutdown();
}
