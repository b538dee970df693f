//! # Serene Core
//!
//! Persistence and session core of the Serene Daily wellness journal: typed
//! CRUD/upsert over journal entries, tasks and activities, a process-wide
//! session context, and a debounced autosave timer. Storage is either a
//! remote Postgres database or a local single-blob JSON store, chosen at
//! startup; callers see one surface either way.

use std::sync::Arc;

pub mod auth;
pub mod autosave;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod session;

pub use autosave::AutosaveTimer;
pub use config::{init_tracing, Config};
pub use error::{AppError, AppResult};
pub use service::DataService;
pub use session::{AuthGate, Session, Theme};

/// Wired-up application core: configuration, data service, session context.
pub struct App {
    pub config: Config,
    pub service: DataService,
    pub session: Arc<Session>,
}

impl App {
    /// Initialize from the environment (`.env` honored): pick the backend,
    /// build the service, start the session context.
    pub async fn init() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::with_config(Config::from_env()).await
    }

    pub async fn with_config(config: Config) -> AppResult<Self> {
        let backend = backend::connect(&config).await?;
        let service = DataService::new(backend);
        let session = Arc::new(Session::new(service.clone(), config.theme_path()));
        session.start().await;
        Ok(Self {
            config,
            service,
            session,
        })
    }

    /// A fresh autosave timer with the configured quiet period. Each editor
    /// view owns its own timer so teardown cancels only its pending write.
    pub fn autosave(&self) -> AutosaveTimer {
        AutosaveTimer::from_config(self.service.clone(), &self.config)
    }

    pub fn shutdown(&self) {
        self.session.shutdown();
    }
}
