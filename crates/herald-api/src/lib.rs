//! JSON REST API for Herald.
//!
//! Exposes two axum [`Router`]s backed by any
//! [`herald_core::store::ReminderStore`] + [`herald_core::transport::Transport`]
//! pair: a public router for subscriber-facing operations and an organizer
//! router for administrative ones. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .nest("/api",   herald_api::public_router(engine.clone()))
//!   .nest("/admin", herald_api::organizer_router(engine).layer(auth))
//! ```

pub mod error;
pub mod happenings;
pub mod registrations;
pub mod subscribers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use herald_core::{store::ReminderStore, transport::Transport};
use herald_engine::Engine;

pub use error::ApiError;

/// Build the subscriber-facing router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn public_router<S, T>(engine: Arc<Engine<S, T>>) -> Router<()>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  Router::new()
    // Subscribers
    .route("/subscribers", post(subscribers::create::<S, T>))
    .route("/subscribers/{id}", get(subscribers::get_one::<S, T>))
    .route(
      "/subscribers/{id}/topics/{topic}",
      put(subscribers::set_topic::<S, T>),
    )
    // Happenings (read-only here)
    .route("/happenings", get(happenings::list::<S, T>))
    .route("/happenings/{id}", get(happenings::get_one::<S, T>))
    // Registrations
    .route(
      "/happenings/{id}/register",
      post(registrations::register::<S, T>),
    )
    .route(
      "/happenings/{id}/unregister",
      post(registrations::unregister::<S, T>),
    )
    .route(
      "/registrations/{id}/reminders",
      get(registrations::reminders::<S, T>),
    )
    .route(
      "/registrations/{id}/confirm",
      post(registrations::confirm::<S, T>),
    )
    .route(
      "/registrations/{id}/decline",
      post(registrations::decline::<S, T>),
    )
    .with_state(engine)
}

/// Build the organizer router for `engine`. The caller wraps it in whatever
/// auth layer fits the deployment.
pub fn organizer_router<S, T>(engine: Arc<Engine<S, T>>) -> Router<()>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  Router::new()
    .route("/happenings", post(happenings::create::<S, T>))
    .route("/happenings/{id}/cancel", post(happenings::cancel::<S, T>))
    .route(
      "/happenings/{id}/announce",
      post(happenings::announce::<S, T>),
    )
    .route(
      "/happenings/{id}/registrations",
      get(happenings::registrations::<S, T>),
    )
    .with_state(engine)
}
