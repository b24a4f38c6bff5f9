//! HTTP server assembly for Herald.
//!
//! Mounts the public JSON API under `/api` and the basic-auth-guarded
//! organizer API under `/admin`, backed by the SQLite store and the webhook
//! delivery transport.

pub mod auth;
pub mod error;
pub mod transport;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use herald_engine::{Engine, EngineConfig};
use herald_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use transport::WebhookTransport;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `HERALD_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Webhook sink every notice is POSTed to.
  pub delivery_url:       String,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default)]
  pub engine:             EngineSettings,
}

/// Engine tuning knobs, all defaulted.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct EngineSettings {
  /// Dispatch tick interval. Short relative to the imminent offset, so
  /// worst-case lateness is bounded by one tick plus processing time.
  #[serde(default = "default_tick_interval_secs")]
  pub tick_interval_secs:    u64,
  #[serde(default = "default_delivery_timeout_secs")]
  pub delivery_timeout_secs: u64,
  #[serde(default = "default_delivery_concurrency")]
  pub delivery_concurrency:  usize,
  #[serde(default = "default_long_lead_minutes")]
  pub long_lead_minutes:     i64,
  #[serde(default = "default_imminent_minutes")]
  pub imminent_minutes:      i64,
}

fn default_tick_interval_secs() -> u64 { 60 }
fn default_delivery_timeout_secs() -> u64 { 10 }
fn default_delivery_concurrency() -> usize { 8 }
fn default_long_lead_minutes() -> i64 { 24 * 60 }
fn default_imminent_minutes() -> i64 { 15 }

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      tick_interval_secs:    default_tick_interval_secs(),
      delivery_timeout_secs: default_delivery_timeout_secs(),
      delivery_concurrency:  default_delivery_concurrency(),
      long_lead_minutes:     default_long_lead_minutes(),
      imminent_minutes:      default_imminent_minutes(),
    }
  }
}

impl EngineSettings {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      schedule:             herald_core::reminder::ReminderSchedule {
        long_lead: chrono::Duration::minutes(self.long_lead_minutes),
        imminent:  chrono::Duration::minutes(self.imminent_minutes),
      },
      delivery_concurrency: self.delivery_concurrency,
      delivery_timeout:     Duration::from_secs(self.delivery_timeout_secs),
    }
  }

  pub fn tick_interval(&self) -> Duration {
    Duration::from_secs(self.tick_interval_secs)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The engine type this server runs.
pub type ServerEngine = Engine<SqliteStore, WebhookTransport>;

/// Build the full application router: public API plus auth-guarded organizer
/// API, with request tracing.
pub fn router(engine: Arc<ServerEngine>, auth: Arc<AuthConfig>) -> Router {
  Router::new()
    .nest("/api", herald_api::public_router(Arc::clone(&engine)))
    .nest(
      "/admin",
      herald_api::organizer_router(engine)
        .layer(middleware::from_fn_with_state(auth, auth::require_auth)),
    )
    .layer(TraceLayer::new_for_http())
}
