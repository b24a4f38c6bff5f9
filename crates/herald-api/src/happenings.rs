//! Handlers for `/happenings` endpoints.
//!
//! Read endpoints are public; creation, cancellation, and announcements are
//! organizer operations — the server decides what auth wraps them.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  happening::{Happening, NewHappening},
  store::{ActiveRegistration, ReminderStore},
  subscriber::Topic,
  transport::Transport,
};
use herald_engine::{DeliveryTally, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If set, restrict to happenings of this topic.
  pub topic: Option<Topic>,
  /// Maximum number of rows returned. Defaults to 20.
  pub limit: Option<usize>,
}

/// `GET /happenings[?topic=...][&limit=...]` — upcoming, soonest first.
pub async fn list<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Happening>>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let happenings = engine
    .list_upcoming_happenings(params.topic, params.limit.unwrap_or(20))
    .await?;
  Ok(Json(happenings))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /happenings/:id`
pub async fn get_one<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Happening>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let happening = engine
    .happening(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("happening {id} not found")))?;
  Ok(Json(happening))
}

// ─── Create (organizer) ──────────────────────────────────────────────────────

/// Response to `POST /happenings`: the stored row plus the announcement
/// fan-out tally.
#[derive(Debug, Serialize)]
pub struct PublishedHappening {
  pub happening:    Happening,
  pub announcement: DeliveryTally,
}

/// `POST /happenings` — create and announce to topic subscribers.
pub async fn create<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Json(body): Json<NewHappening>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let (happening, announcement) = engine.publish_happening(body).await?;
  Ok((
    StatusCode::CREATED,
    Json(PublishedHappening { happening, announcement }),
  ))
}

// ─── Cancel (organizer) ──────────────────────────────────────────────────────

/// Response to `POST /happenings/:id/cancel`.
#[derive(Debug, Serialize)]
pub struct CancelledHappeningResponse {
  pub happening:     Happening,
  pub notifications: DeliveryTally,
}

/// `POST /happenings/:id/cancel` — cancel, suppress obligations, notify
/// everyone registered.
pub async fn cancel<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CancelledHappeningResponse>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let (happening, notifications) = engine.cancel_happening(id).await?;
  Ok(Json(CancelledHappeningResponse { happening, notifications }))
}

// ─── Announce (organizer) ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnnounceBody {
  pub text: String,
}

/// `POST /happenings/:id/announce` — ad-hoc message to active registrations.
pub async fn announce<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnnounceBody>,
) -> Result<Json<DeliveryTally>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  if body.text.trim().is_empty() {
    return Err(ApiError::BadRequest("announcement text is empty".into()));
  }
  let tally = engine.announce(id, &body.text).await?;
  Ok(Json(tally))
}

// ─── Registrations listing (organizer) ───────────────────────────────────────

/// `GET /happenings/:id/registrations` — active registrations with their
/// subscribers.
pub async fn registrations<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActiveRegistration>>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let active = engine.active_registrations(id).await?;
  Ok(Json(active))
}
