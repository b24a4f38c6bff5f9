//! The `ReminderStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `herald-store-sqlite`).
//! Higher layers (`herald-engine`, `herald-api`) depend on this abstraction,
//! not on any concrete backend. The store is the only coordination point
//! between dispatcher instances: the atomic claim is a store operation, never
//! an in-process lock.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  happening::{Happening, NewHappening},
  registration::Registration,
  reminder::{DeliveryOutcome, Reminder, ReminderSchedule},
  subscriber::{NewSubscriber, Subscriber, SubscriberId, Topic},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// A due obligation joined with everything a delivery needs: the recipient
/// and the happening the notice text is rendered from.
#[derive(Debug, Clone)]
pub struct DueReminder {
  pub reminder:   Reminder,
  pub subscriber: Subscriber,
  pub happening:  Happening,
}

/// An active registration together with its subscriber, as returned by
/// [`ReminderStore::list_active_registrations`].
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRegistration {
  pub registration: Registration,
  pub subscriber:   Subscriber,
}

/// Result of cancelling a happening: the flipped row plus the registrations
/// that were active at cancellation time — the out-of-band notification list.
#[derive(Debug, Clone)]
pub struct CancelledHappening {
  pub happening:  Happening,
  pub recipients: Vec<ActiveRegistration>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable, query-capable Herald store.
///
/// Every operation with multi-row side effects (registration +
/// materialization, unregistration + suppression, happening cancellation +
/// propagation) is a single transaction: the combined write either fully
/// happens or fully doesn't.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ReminderStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Subscribers ───────────────────────────────────────────────────────

  /// Create a subscriber on first contact, or refresh `name`/`handle` on
  /// re-contact. Topic subscriptions are preserved across re-contacts.
  fn upsert_subscriber(
    &self,
    input: NewSubscriber,
  ) -> impl Future<Output = Result<Subscriber, Self::Error>> + Send + '_;

  fn get_subscriber(
    &self,
    id: SubscriberId,
  ) -> impl Future<Output = Result<Option<Subscriber>, Self::Error>> + Send + '_;

  /// Toggle a single topic flag. Errors if the subscriber does not exist.
  fn set_topic_subscription(
    &self,
    id: SubscriberId,
    topic: Topic,
    enabled: bool,
  ) -> impl Future<Output = Result<Subscriber, Self::Error>> + Send + '_;

  fn subscribers_for_topic(
    &self,
    topic: Topic,
  ) -> impl Future<Output = Result<Vec<Subscriber>, Self::Error>> + Send + '_;

  // ── Happenings ────────────────────────────────────────────────────────

  fn add_happening(
    &self,
    input: NewHappening,
  ) -> impl Future<Output = Result<Happening, Self::Error>> + Send + '_;

  fn get_happening(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Happening>, Self::Error>> + Send + '_;

  /// Happenings with `scheduled_at > now` and `cancelled = false`, soonest
  /// first, optionally restricted to one topic.
  fn list_upcoming_happenings(
    &self,
    topic: Option<Topic>,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Happening>, Self::Error>> + Send + '_;

  /// Atomically: flip the monotonic `cancelled` flag, capture the active
  /// registrations (the notification list), cancel those registrations, and
  /// suppress their pending reminders. Errors `AlreadyCancelled` on a second
  /// call and `HappeningNotFound` for an unknown id.
  fn cancel_happening(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<CancelledHappening, Self::Error>> + Send + '_;

  // ── Registrations ─────────────────────────────────────────────────────

  /// Register a subscriber for a happening and materialize its reminders in
  /// the same transaction — the two never exist without each other.
  ///
  /// Reactivates an existing cancelled row instead of inserting. If the
  /// registration is already active, returns it unchanged with no new
  /// reminders. Errors `AlreadyCancelledHappening` if the happening is
  /// cancelled, and the respective not-found error for missing references.
  fn register(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
    schedule: ReminderSchedule,
  ) -> impl Future<Output = Result<(Registration, Vec<Reminder>), Self::Error>>
  + Send
  + '_;

  /// Cancel a registration and suppress its pending reminders in the same
  /// transaction. Idempotent: unregistering an already-cancelled
  /// registration returns it unchanged.
  fn unregister(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Same as [`Self::unregister`], keyed by registration id. Used by the
  /// decline flow and by automatic retirement of blocked recipients.
  fn unregister_by_id(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn get_registration(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  fn get_registration_by_id(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  fn list_active_registrations(
    &self,
    happening_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ActiveRegistration>, Self::Error>> + Send + '_;

  // ── Reminders ─────────────────────────────────────────────────────────

  /// The due-obligation selector: every reminder with `fire_at <= now`,
  /// still pending, whose registration is active and whose happening is not
  /// cancelled — oldest first. A pure read; exactly-once is enforced by
  /// [`Self::claim_reminder`], not here.
  fn due_reminders(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DueReminder>, Self::Error>> + Send + '_;

  /// The atomic claim: compare-and-set `Pending → Sent`, conditioned on the
  /// owning registration still being active and the happening not cancelled,
  /// expressed as a single conditional update visible to every dispatcher
  /// instance. Returns whether this caller won the claim.
  fn claim_reminder(
    &self,
    reminder_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record the terminal delivery outcome of a claimed reminder.
  fn finalize_outcome(
    &self,
    reminder_id: Uuid,
    outcome: DeliveryOutcome,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Pending reminders for one registration, soonest first — the read-only
  /// display query.
  fn pending_reminders(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Reminder>, Self::Error>> + Send + '_;

  fn get_reminder(
    &self,
    reminder_id: Uuid,
  ) -> impl Future<Output = Result<Option<Reminder>, Self::Error>> + Send + '_;
}
