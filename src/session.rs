//! Process-wide session context: who is signed in and which theme is active.
//!
//! Two writers touch `user`: the manual `sync_user` path and the auth-event
//! listener. Both go through the same lock, so the last write wins and no
//! torn state is observable.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::backend::AuthEvent;
use crate::error::AppResult;
use crate::models::User;
use crate::service::DataService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::Light
    }
}

/// What a screen should do with the current auth state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthGate {
    /// First sync has not completed; render a neutral waiting state.
    Loading,
    /// No user; redirect to the auth screen.
    SignedOut,
    SignedIn(User),
}

#[derive(Debug)]
struct SessionState {
    user: Option<User>,
    loading: bool,
    theme: Theme,
}

pub struct Session {
    service: DataService,
    state: Arc<RwLock<SessionState>>,
    theme_path: PathBuf,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Build the context, restoring the persisted theme. Call [`start`]
    /// afterwards to run the first sync and attach the auth listener.
    ///
    /// [`start`]: Session::start
    pub fn new(service: DataService, theme_path: PathBuf) -> Self {
        let theme = std::fs::read_to_string(&theme_path)
            .ok()
            .and_then(|s| Theme::parse(&s))
            .unwrap_or_default();
        Self {
            service,
            state: Arc::new(RwLock::new(SessionState {
                user: None,
                loading: true,
                theme,
            })),
            theme_path,
            listener: Mutex::new(None),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Run the initial user sync and subscribe to backend auth-state
    /// notifications. Subscribing happens before the sync so no event
    /// emitted in between is missed.
    pub async fn start(&self) {
        let mut rx = self.service.backend().subscribe_auth();
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::SignedIn(user)) => {
                        let mut guard = state.write().unwrap_or_else(|p| p.into_inner());
                        guard.user = Some(user);
                    }
                    Ok(AuthEvent::SignedOut) => {
                        let mut guard = state.write().unwrap_or_else(|p| p.into_inner());
                        guard.user = None;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        let previous = self.listener.lock().unwrap_or_else(|p| p.into_inner()).replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        self.sync_user().await;
    }

    /// Re-query the backend for the current user. Sets `loading` for the
    /// duration; callable at any time after startup.
    pub async fn sync_user(&self) {
        self.write_state().loading = true;
        let user = self.service.current_user().await;
        let mut guard = self.write_state();
        guard.user = user;
        guard.loading = false;
    }

    pub fn user(&self) -> Option<User> {
        self.read_state().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().loading
    }

    /// Capability gate for screens: check loading first, then presence.
    /// Not a security boundary; the backend enforces access.
    pub fn auth_gate(&self) -> AuthGate {
        let guard = self.read_state();
        if guard.loading {
            AuthGate::Loading
        } else {
            match &guard.user {
                Some(user) => AuthGate::SignedIn(user.clone()),
                None => AuthGate::SignedOut,
            }
        }
    }

    pub fn theme(&self) -> Theme {
        self.read_state().theme
    }

    /// Update the theme in memory and on disk, synchronously.
    pub fn set_theme(&self, theme: Theme) -> AppResult<()> {
        self.write_state().theme = theme;
        std::fs::write(&self.theme_path, theme.as_str())?;
        Ok(())
    }

    /// Detach from auth notifications. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let handle = self.listener.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
