//! [`Dispatcher`] — the recurring dispatch loop.
//!
//! Per tick: select due obligations, claim each one atomically at the store,
//! deliver the claimed ones, finalize outcomes. The claim — not the delivery
//! — is the exactly-once point of truth: a reminder whose claim is lost was
//! taken by another dispatcher instance or invalidated by a cancellation,
//! and is skipped without error.

use chrono::{DateTime, Utc};
use futures::{StreamExt as _, stream};
use serde::Serialize;
use tracing::{error, info, warn};

use herald_core::{
  Result,
  reminder::DeliveryOutcome,
  store::{DueReminder, ReminderStore},
  transport::{DeliveryResult, Transport},
};

use crate::{Engine, broadcast, render};

// ─── Tick summary ────────────────────────────────────────────────────────────

/// What one tick did, for logs and operator visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
  /// Obligations the selector returned.
  pub selected:  usize,
  /// Claims lost to another dispatcher or to a concurrent cancellation.
  pub lost:      usize,
  pub delivered: usize,
  pub blocked:   usize,
  pub transient: usize,
  /// Store failures while claiming or finalizing; logged per reminder.
  pub errors:    usize,
}

enum Processed {
  Lost,
  Delivered,
  Blocked,
  Transient,
  Errored,
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

pub struct Dispatcher<S, T> {
  engine:        Engine<S, T>,
  tick_interval: std::time::Duration,
}

impl<S, T> Dispatcher<S, T>
where
  S: ReminderStore,
  T: Transport,
{
  pub fn new(engine: Engine<S, T>, tick_interval: std::time::Duration) -> Self {
    Self { engine, tick_interval }
  }

  /// Run forever on a fixed interval. Ticks never overlap: a tick runs to
  /// completion before the next is considered, and intervals that elapse
  /// while one is in flight are skipped, not queued.
  pub async fn run(self) {
    let mut interval = tokio::time::interval(self.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(interval_ms = self.tick_interval.as_millis() as u64, "dispatcher started");

    loop {
      interval.tick().await;
      match self.tick(Utc::now()).await {
        Ok(summary) if summary.selected > 0 => {
          info!(
            selected = summary.selected,
            lost = summary.lost,
            delivered = summary.delivered,
            blocked = summary.blocked,
            transient = summary.transient,
            errors = summary.errors,
            "dispatch tick complete"
          );
        }
        Ok(_) => {}
        Err(error) => error!(%error, "dispatch tick failed"),
      }
    }
  }

  /// One pass of the loop: Selecting → Delivering → Finalizing.
  ///
  /// Public so tests (and operators) can drive the loop at chosen instants.
  pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
    let due = self
      .engine
      .store
      .due_reminders(now)
      .await
      .map_err(Into::into)?;

    let mut summary = TickSummary { selected: due.len(), ..Default::default() };

    // Deliveries within a tick are independent per recipient and may run
    // concurrently, bounded by the configured limit.
    let outcomes: Vec<Processed> = stream::iter(due)
      .map(|reminder| self.process(reminder))
      .buffer_unordered(self.engine.config.delivery_concurrency.max(1))
      .collect()
      .await;

    for outcome in outcomes {
      match outcome {
        Processed::Lost => summary.lost += 1,
        Processed::Delivered => summary.delivered += 1,
        Processed::Blocked => summary.blocked += 1,
        Processed::Transient => summary.transient += 1,
        Processed::Errored => summary.errors += 1,
      }
    }

    Ok(summary)
  }

  /// Claim, deliver, finalize one obligation. Failures are isolated to this
  /// reminder; they never abort the rest of the tick.
  async fn process(&self, due: DueReminder) -> Processed {
    let reminder_id = due.reminder.reminder_id;

    match self.engine.store.claim_reminder(reminder_id).await {
      Ok(true) => {}
      Ok(false) => return Processed::Lost,
      Err(e) => {
        let error: herald_core::Error = e.into();
        error!(%reminder_id, %error, "claim failed");
        return Processed::Errored;
      }
    }

    let notice = render::reminder(&due);
    let result = broadcast::deliver_once(
      self.engine.transport.as_ref(),
      &due.subscriber.subscriber_id,
      &notice,
      self.engine.config.delivery_timeout,
    )
    .await;

    match result {
      DeliveryResult::Delivered => {
        self.finalize(reminder_id, DeliveryOutcome::Delivered).await;
        info!(
          %reminder_id,
          kind = due.reminder.kind.discriminant(),
          subscriber_id = %due.subscriber.subscriber_id,
          "reminder delivered"
        );
        Processed::Delivered
      }
      DeliveryResult::Blocked => {
        self.finalize(reminder_id, DeliveryOutcome::Blocked).await;
        // An unreachable recipient can never receive future obligations for
        // this registration either: retire it now.
        match self
          .engine
          .store
          .unregister_by_id(due.reminder.registration_id)
          .await
        {
          Ok(_) => info!(
            %reminder_id,
            registration_id = %due.reminder.registration_id,
            "recipient blocked delivery; registration auto-unregistered"
          ),
          Err(e) => {
            let error: herald_core::Error = e.into();
            warn!(%reminder_id, %error, "failed to auto-unregister blocked recipient");
          }
        }
        Processed::Blocked
      }
      DeliveryResult::Transient(reason) => {
        // Terminal for this obligation: retrying an already-claimed send
        // risks a duplicate without a stronger idempotency key than the
        // reminder id provides.
        self
          .finalize(reminder_id, DeliveryOutcome::TransientFailure)
          .await;
        warn!(
          %reminder_id,
          subscriber_id = %due.subscriber.subscriber_id,
          %reason,
          "transient delivery failure; obligation stays claimed, not retried"
        );
        Processed::Transient
      }
    }
  }

  async fn finalize(&self, reminder_id: uuid::Uuid, outcome: DeliveryOutcome) {
    if let Err(e) = self
      .engine
      .store
      .finalize_outcome(reminder_id, outcome)
      .await
    {
      let error: herald_core::Error = e.into();
      error!(%reminder_id, ?outcome, %error, "failed to record delivery outcome");
    }
  }
}
