//! Handlers for registration and reminder-response endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/happenings/:id/register` | Body: `{"subscriber_id": ...}` |
//! | `POST` | `/happenings/:id/unregister` | Idempotent |
//! | `GET`  | `/registrations/:id/reminders` | Pending obligations, for display |
//! | `POST` | `/registrations/:id/confirm` | Long-lead prompt: still attending |
//! | `POST` | `/registrations/:id/decline` | Long-lead prompt: cancel everything |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  registration::Registration,
  reminder::Reminder,
  store::ReminderStore,
  subscriber::SubscriberId,
  transport::Transport,
};
use herald_engine::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub subscriber_id: SubscriberId,
}

/// `POST /happenings/:id/register`
pub async fn register<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(happening_id): Path<Uuid>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let registration = engine.register(body.subscriber_id, happening_id).await?;
  Ok((StatusCode::CREATED, Json(registration)))
}

/// `POST /happenings/:id/unregister`
pub async fn unregister<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(happening_id): Path<Uuid>,
  Json(body): Json<RegisterBody>,
) -> Result<Json<Registration>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let registration = engine.unregister(body.subscriber_id, happening_id).await?;
  Ok(Json(registration))
}

/// `GET /registrations/:id/reminders` — pending obligations, soonest first.
pub async fn reminders<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(registration_id): Path<Uuid>,
) -> Result<Json<Vec<Reminder>>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let reminders = engine.upcoming_reminders(registration_id).await?;
  Ok(Json(reminders))
}

/// `POST /registrations/:id/confirm`
pub async fn confirm<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(registration_id): Path<Uuid>,
) -> Result<Json<Registration>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let registration = engine.confirm_reminder(registration_id).await?;
  Ok(Json(registration))
}

/// `POST /registrations/:id/decline` — cascades through unregistration, so
/// the pending imminent reminder can never fire.
pub async fn decline<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(registration_id): Path<Uuid>,
) -> Result<Json<Registration>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let registration = engine.decline_reminder(registration_id).await?;
  Ok(Json(registration))
}
