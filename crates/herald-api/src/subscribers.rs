//! Handlers for `/subscribers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subscribers` | First-contact upsert; returns 201 + subscriber |
//! | `GET`  | `/subscribers/:id` | Single subscriber |
//! | `PUT`  | `/subscribers/:id/topics/:topic` | Body: `{"enabled": bool}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  store::ReminderStore,
  subscriber::{NewSubscriber, Subscriber, SubscriberId, Topic},
  transport::Transport,
};
use herald_engine::Engine;
use serde::Deserialize;

use crate::error::ApiError;

/// JSON body accepted by `POST /subscribers`.
#[derive(Debug, Deserialize)]
pub struct NewSubscriberBody {
  pub subscriber_id: SubscriberId,
  pub name:          String,
  pub handle:        Option<String>,
}

impl From<NewSubscriberBody> for NewSubscriber {
  fn from(b: NewSubscriberBody) -> Self {
    NewSubscriber {
      subscriber_id: b.subscriber_id,
      name:          b.name,
      handle:        b.handle,
    }
  }
}

/// `POST /subscribers` — create on first contact, refresh on re-contact.
pub async fn create<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Json(body): Json<NewSubscriberBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let subscriber = engine.ensure_subscriber(NewSubscriber::from(body)).await?;
  Ok((StatusCode::CREATED, Json(subscriber)))
}

/// `GET /subscribers/:id`
pub async fn get_one<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path(id): Path<SubscriberId>,
) -> Result<Json<Subscriber>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let subscriber = engine
    .subscriber(id.clone())
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("subscriber {id} not found")))?;
  Ok(Json(subscriber))
}

#[derive(Debug, Deserialize)]
pub struct SetTopicBody {
  pub enabled: bool,
}

/// `PUT /subscribers/:id/topics/:topic` — body: `{"enabled": bool}`.
pub async fn set_topic<S, T>(
  State(engine): State<Arc<Engine<S, T>>>,
  Path((id, topic)): Path<(SubscriberId, Topic)>,
  Json(body): Json<SetTopicBody>,
) -> Result<Json<Subscriber>, ApiError>
where
  S: ReminderStore + 'static,
  T: Transport + 'static,
{
  let subscriber = engine
    .set_topic_subscription(id, topic, body.enabled)
    .await?;
  Ok(Json(subscriber))
}
