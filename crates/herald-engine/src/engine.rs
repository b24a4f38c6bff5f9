//! [`Engine`] — the operation surface exposed to UI/admin collaborators.
//!
//! Every method delegates durability to the store (which owns the
//! transactional invariants) and delivery to the broadcast fan-out. The
//! engine itself holds no mutable state: the store handle is the only
//! coordination point, so any number of engine instances can serve the same
//! database.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use herald_core::{
  Error, Result,
  happening::{Happening, NewHappening},
  registration::Registration,
  reminder::{Reminder, ReminderSchedule},
  store::{ActiveRegistration, ReminderStore},
  subscriber::{NewSubscriber, Subscriber, SubscriberId, Topic},
  transport::Transport,
};

use crate::{
  broadcast::{self, DeliveryTally, Recipient},
  render,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Engine tuning. The delivery limits apply to reminder dispatch and to
/// broadcasts alike; the concurrency bound respects the transport's own rate
/// limits and is configuration, not a constant.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
  pub schedule:             ReminderSchedule,
  pub delivery_concurrency: usize,
  pub delivery_timeout:     Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      schedule:             ReminderSchedule::default(),
      delivery_concurrency: 8,
      delivery_timeout:     Duration::from_secs(10),
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S, T> {
  pub(crate) store:     S,
  pub(crate) transport: Arc<T>,
  pub(crate) config:    EngineConfig,
}

impl<S: Clone, T> Clone for Engine<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      transport: Arc::clone(&self.transport),
      config:    self.config,
    }
  }
}

impl<S, T> Engine<S, T>
where
  S: ReminderStore,
  T: Transport,
{
  pub fn new(store: S, transport: Arc<T>, config: EngineConfig) -> Self {
    Self { store, transport, config }
  }

  // ── Subscribers ───────────────────────────────────────────────────────────

  /// Create the subscriber on first contact, or refresh their name/handle.
  pub async fn ensure_subscriber(&self, input: NewSubscriber) -> Result<Subscriber> {
    let subscriber =
      self.store.upsert_subscriber(input).await.map_err(Into::into)?;
    info!(subscriber_id = %subscriber.subscriber_id, "subscriber upserted");
    Ok(subscriber)
  }

  pub async fn subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
    self.store.get_subscriber(id).await.map_err(Into::into)
  }

  pub async fn set_topic_subscription(
    &self,
    id: SubscriberId,
    topic: Topic,
    enabled: bool,
  ) -> Result<Subscriber> {
    let subscriber = self
      .store
      .set_topic_subscription(id, topic, enabled)
      .await
      .map_err(Into::into)?;
    info!(
      subscriber_id = %subscriber.subscriber_id,
      ?topic,
      enabled,
      "topic subscription toggled"
    );
    Ok(subscriber)
  }

  // ── Happenings ────────────────────────────────────────────────────────────

  /// Create a happening and announce it to every subscriber of its topic.
  pub async fn publish_happening(
    &self,
    input: NewHappening,
  ) -> Result<(Happening, DeliveryTally)> {
    let happening = self.store.add_happening(input).await.map_err(Into::into)?;

    let recipients: Vec<Recipient> = self
      .store
      .subscribers_for_topic(happening.topic)
      .await
      .map_err(Into::into)?
      .into_iter()
      .map(|s| Recipient {
        subscriber_id:   s.subscriber_id,
        registration_id: None,
      })
      .collect();

    let notice = render::announcement(&happening);
    let tally = self.broadcast(&recipients, &notice).await;

    info!(
      happening_id = %happening.happening_id,
      title = %happening.title,
      delivered = tally.delivered,
      blocked = tally.blocked,
      transient = tally.transient,
      "happening published and announced"
    );
    Ok((happening, tally))
  }

  pub async fn happening(&self, id: Uuid) -> Result<Option<Happening>> {
    self.store.get_happening(id).await.map_err(Into::into)
  }

  pub async fn list_upcoming_happenings(
    &self,
    topic: Option<Topic>,
    limit: usize,
  ) -> Result<Vec<Happening>> {
    self
      .store
      .list_upcoming_happenings(topic, Utc::now(), limit)
      .await
      .map_err(Into::into)
  }

  /// Cancel a happening and immediately notify everyone who was registered —
  /// out of band, independent of the reminder pipeline, whose obligations
  /// the store has already suppressed by the time this broadcast starts.
  pub async fn cancel_happening(
    &self,
    id: Uuid,
  ) -> Result<(Happening, DeliveryTally)> {
    let cancelled = self.store.cancel_happening(id).await.map_err(Into::into)?;

    let recipients: Vec<Recipient> = cancelled
      .recipients
      .iter()
      .map(|ar| Recipient {
        subscriber_id:   ar.subscriber.subscriber_id.clone(),
        registration_id: Some(ar.registration.registration_id),
      })
      .collect();

    let notice = render::cancellation(&cancelled.happening);
    let tally = self.broadcast(&recipients, &notice).await;

    info!(
      happening_id = %id,
      recipients = recipients.len(),
      delivered = tally.delivered,
      blocked = tally.blocked,
      transient = tally.transient,
      "happening cancelled, registrations notified"
    );
    Ok((cancelled.happening, tally))
  }

  /// Ad-hoc organizer message to a happening's active registrations.
  pub async fn announce(&self, id: Uuid, text: &str) -> Result<DeliveryTally> {
    let happening = self
      .store
      .get_happening(id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::HappeningNotFound(id))?;

    let recipients: Vec<Recipient> = self
      .store
      .list_active_registrations(id)
      .await
      .map_err(Into::into)?
      .into_iter()
      .map(|ar| Recipient {
        subscriber_id:   ar.subscriber.subscriber_id,
        registration_id: Some(ar.registration.registration_id),
      })
      .collect();

    let notice = render::organizer_message(&happening, text);
    let tally = self.broadcast(&recipients, &notice).await;

    info!(
      happening_id = %id,
      recipients = recipients.len(),
      delivered = tally.delivered,
      "organizer announcement sent"
    );
    Ok(tally)
  }

  pub async fn active_registrations(
    &self,
    happening_id: Uuid,
  ) -> Result<Vec<ActiveRegistration>> {
    // Surface NotFound for unknown happenings rather than an empty list.
    self
      .store
      .get_happening(happening_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::HappeningNotFound(happening_id))?;
    self
      .store
      .list_active_registrations(happening_id)
      .await
      .map_err(Into::into)
  }

  // ── Registrations ─────────────────────────────────────────────────────────

  pub async fn register(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> Result<Registration> {
    let (registration, reminders) = self
      .store
      .register(subscriber_id, happening_id, self.config.schedule)
      .await
      .map_err(Into::into)?;
    info!(
      registration_id = %registration.registration_id,
      subscriber_id = %registration.subscriber_id,
      happening_id = %happening_id,
      reminders = reminders.len(),
      "registration active"
    );
    Ok(registration)
  }

  pub async fn unregister(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> Result<Registration> {
    let registration = self
      .store
      .unregister(subscriber_id, happening_id)
      .await
      .map_err(Into::into)?;
    info!(
      registration_id = %registration.registration_id,
      happening_id = %happening_id,
      "registration cancelled"
    );
    Ok(registration)
  }

  /// Pending reminders for one registration — the read-only display query.
  pub async fn upcoming_reminders(
    &self,
    registration_id: Uuid,
  ) -> Result<Vec<Reminder>> {
    self
      .store
      .get_registration_by_id(registration_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RegistrationNotFound(registration_id))?;
    self
      .store
      .pending_reminders(registration_id)
      .await
      .map_err(Into::into)
  }

  // ── Reminder responses ────────────────────────────────────────────────────

  /// The recipient confirmed attendance from a long-lead reminder.
  pub async fn confirm_reminder(&self, registration_id: Uuid) -> Result<Registration> {
    let registration = self
      .store
      .get_registration_by_id(registration_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RegistrationNotFound(registration_id))?;
    info!(%registration_id, "attendance confirmed");
    Ok(registration)
  }

  /// The recipient declined from a long-lead reminder. Routed through
  /// unregistration, so the pending imminent reminder can never fire.
  pub async fn decline_reminder(&self, registration_id: Uuid) -> Result<Registration> {
    let registration = self
      .store
      .unregister_by_id(registration_id)
      .await
      .map_err(Into::into)?;
    info!(%registration_id, "attendance declined, registration cancelled");
    Ok(registration)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  pub(crate) async fn broadcast(
    &self,
    recipients: &[Recipient],
    notice: &herald_core::transport::Notice,
  ) -> DeliveryTally {
    broadcast::fan_out(
      &self.store,
      self.transport.as_ref(),
      recipients,
      notice,
      self.config.delivery_concurrency,
      self.config.delivery_timeout,
    )
    .await
  }
}
