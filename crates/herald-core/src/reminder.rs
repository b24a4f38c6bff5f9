//! Reminder obligations and the materialization policy.
//!
//! A reminder is a durable promise to send exactly one notification at or
//! after `fire_at`, unless cancelled first. The `state` column is the claim
//! coordination point: `Pending → Sent` happens only through the atomic
//! claim, `Pending → Suppressed` only through cancellation propagation, and
//! neither transition is ever reversed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The closed set of reminder kinds. Each kind maps to a fixed offset before
/// the happening's scheduled time and to its own notice rendering.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
  /// Day-scale lead time; the notice carries an accept/decline prompt.
  LongLead,
  /// Minute-scale lead time; the notice carries the location payload.
  Imminent,
}

impl ReminderKind {
  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::LongLead => "long_lead",
      Self::Imminent => "imminent",
    }
  }

  /// How long before the happening's scheduled time this kind fires.
  pub fn offset(&self, schedule: &ReminderSchedule) -> Duration {
    match self {
      Self::LongLead => schedule.long_lead,
      Self::Imminent => schedule.imminent,
    }
  }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Offsets before `scheduled_at` at which each reminder kind fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
  pub long_lead: Duration,
  pub imminent:  Duration,
}

impl Default for ReminderSchedule {
  fn default() -> Self {
    Self {
      long_lead: Duration::hours(24),
      imminent:  Duration::minutes(15),
    }
  }
}

impl ReminderSchedule {
  /// Compute the full set of (kind, fire time) pairs for a happening.
  ///
  /// Fire times already in the past are kept: a late sign-up still gets its
  /// obligations, and the due-selector alone decides due-ness
  /// (`fire_at <= now`).
  pub fn materialize(
    &self,
    scheduled_at: DateTime<Utc>,
  ) -> Vec<(ReminderKind, DateTime<Utc>)> {
    ReminderKind::iter()
      .map(|kind| (kind, scheduled_at - kind.offset(self)))
      .collect()
  }
}

// ─── State and outcome ───────────────────────────────────────────────────────

/// Lifecycle state of a reminder. `Sent` means claimed: the right to act was
/// taken exactly once, whatever the delivery outcome. `Suppressed` means
/// finalized with no send owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
  Pending,
  Sent,
  Suppressed,
}

impl ReminderState {
  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending) }
}

/// Terminal delivery outcome, recorded after a claimed send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
  Delivered,
  /// The recipient permanently blocked or deleted their identity.
  Blocked,
  /// Timeout or network failure. Terminal for this reminder — the engine
  /// never retries a claimed send.
  TransientFailure,
}

// ─── Reminder ────────────────────────────────────────────────────────────────

/// One scheduled future notification, owned by a registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
  pub reminder_id:     Uuid,
  pub registration_id: Uuid,
  pub kind:            ReminderKind,
  pub fire_at:         DateTime<Utc>,
  pub state:           ReminderState,
  pub outcome:         Option<DeliveryOutcome>,
  pub created_at:      DateTime<Utc>,
  pub claimed_at:      Option<DateTime<Utc>>,
  pub finalized_at:    Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn materialize_produces_one_obligation_per_kind() {
    let scheduled_at = Utc::now() + Duration::days(7);
    let pairs = ReminderSchedule::default().materialize(scheduled_at);

    assert_eq!(pairs.len(), 2);
    let kinds: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
    assert!(kinds.contains(&ReminderKind::LongLead));
    assert!(kinds.contains(&ReminderKind::Imminent));
  }

  #[test]
  fn fire_times_are_strictly_before_scheduled_time() {
    let scheduled_at = Utc::now() + Duration::days(7);
    for (_, fire_at) in ReminderSchedule::default().materialize(scheduled_at) {
      assert!(fire_at < scheduled_at);
    }
  }

  #[test]
  fn late_signup_keeps_past_fire_times() {
    // Happening in five minutes: both nominal fire times are in the past or
    // about to pass, but both obligations are still produced.
    let now = Utc::now();
    let scheduled_at = now + Duration::minutes(5);
    let pairs = ReminderSchedule::default().materialize(scheduled_at);

    assert_eq!(pairs.len(), 2);
    let long_lead = pairs
      .iter()
      .find(|(k, _)| *k == ReminderKind::LongLead)
      .unwrap();
    assert!(long_lead.1 < now);
  }
}
