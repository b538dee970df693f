use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the local single-blob store is used.
    pub database_url: Option<String>,
    /// Directory holding the local store blob and the theme file.
    pub data_dir: PathBuf,
    /// Quiet period for the journal editor autosave, in milliseconds.
    pub autosave_debounce_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            data_dir: env::var("SERENE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            autosave_debounce_ms: env::var("AUTOSAVE_DEBOUNCE_MS")
                .unwrap_or_else(|_| "800".into())
                .parse()
                .expect("AUTOSAVE_DEBOUNCE_MS must be a number"),
        }
    }

    pub fn theme_path(&self) -> PathBuf {
        self.data_dir.join("theme")
    }
}

/// Initialize the global tracing subscriber. Call once at process start.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "serene_core=debug".into()),
        )
        .init();
}
