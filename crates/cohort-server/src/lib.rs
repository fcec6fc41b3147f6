//! Process wiring for the Cohort server: configuration, store opening, and
//! the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use cohort_core::SegmentationEngine;
use cohort_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COHORT_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Per-request deadline; requests still running after this get a 408.
  pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "0.0.0.0".to_string(),
      port:       8080,
      store_path: PathBuf::from("cohort.db"),
      request_timeout_secs: 10,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `COHORT_`-prefixed
  /// environment variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("COHORT"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub type SqliteEngine = SegmentationEngine<SqliteStore, SqliteStore>;

/// Build the engine over a single SQLite store serving both relations.
pub fn engine(store: SqliteStore) -> Arc<SqliteEngine> {
  Arc::new(SegmentationEngine::new(store.clone(), store))
}

/// The full HTTP application.
pub fn router(engine: Arc<SqliteEngine>, config: &ServerConfig) -> Router {
  with_middleware(cohort_api::api_router(engine), config.request_timeout())
}

/// Wrap `app` with the request deadline, panic recovery, and tracing.
fn with_middleware(app: Router, timeout: Duration) -> Router {
  app
    .layer(TimeoutLayer::new(timeout))
    .layer(CatchPanicLayer::new())
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
