//! Broadcast fan-out — one message to many recipients, with per-recipient
//! failure isolation.
//!
//! The dispatch loop routes its single-recipient sends through
//! [`deliver_once`], the same bounded path the many-recipient
//! [`fan_out`] uses, so the isolation contract is identical in both.

use std::time::Duration;

use futures::{StreamExt as _, stream};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use herald_core::{
  store::ReminderStore,
  subscriber::SubscriberId,
  transport::{DeliveryResult, Notice, Transport},
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// One fan-out target. When the recipient is tied to a registration, a
/// permanently-failed delivery retires that registration automatically.
#[derive(Debug, Clone)]
pub struct Recipient {
  pub subscriber_id:   SubscriberId,
  pub registration_id: Option<Uuid>,
}

/// Per-outcome counts for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryTally {
  pub delivered: usize,
  pub blocked:   usize,
  pub transient: usize,
}

// ─── Single-recipient path ───────────────────────────────────────────────────

/// Deliver `notice` to one recipient, bounding the transport call with
/// `timeout`. Expiry is classified as a transient failure — no delivery call
/// blocks indefinitely.
pub async fn deliver_once<T: Transport>(
  transport: &T,
  recipient: &SubscriberId,
  notice: &Notice,
  timeout: Duration,
) -> DeliveryResult {
  match tokio::time::timeout(timeout, transport.deliver(recipient, notice)).await
  {
    Ok(result) => result,
    Err(_) => DeliveryResult::Transient(format!(
      "delivery timed out after {}ms",
      timeout.as_millis()
    )),
  }
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

/// Deliver `notice` to every recipient independently. A single recipient's
/// failure never aborts delivery to the rest. At most `concurrency`
/// deliveries are in flight at once, respecting the transport's rate limits.
///
/// Blocked recipients tied to a registration are auto-unregistered: an
/// unreachable recipient can never receive future obligations either.
pub async fn fan_out<S, T>(
  store: &S,
  transport: &T,
  recipients: &[Recipient],
  notice: &Notice,
  concurrency: usize,
  timeout: Duration,
) -> DeliveryTally
where
  S: ReminderStore,
  T: Transport,
{
  let mut tally = DeliveryTally::default();

  let deliveries = recipients
    .iter()
    .map(|recipient| deliver_to(transport, recipient, notice, timeout))
    .collect::<Vec<_>>();
  let mut deliveries =
    stream::iter(deliveries).buffer_unordered(concurrency.max(1));

  while let Some((recipient, result)) = deliveries.next().await {
    match result {
      DeliveryResult::Delivered => tally.delivered += 1,
      DeliveryResult::Blocked => {
        tally.blocked += 1;
        retire_blocked(store, recipient).await;
      }
      DeliveryResult::Transient(reason) => {
        tally.transient += 1;
        warn!(
          subscriber_id = %recipient.subscriber_id,
          %reason,
          "transient broadcast delivery failure"
        );
      }
    }
  }

  tally
}

/// Deliver `notice` to one fan-out `recipient`, returning it alongside the
/// outcome. Tying every borrow to a single lifetime lets `buffer_unordered`
/// name the returned future's type.
async fn deliver_to<'a, T: Transport>(
  transport: &'a T,
  recipient: &'a Recipient,
  notice: &'a Notice,
  timeout: Duration,
) -> (&'a Recipient, DeliveryResult) {
  let result =
    deliver_once(transport, &recipient.subscriber_id, notice, timeout).await;
  (recipient, result)
}

/// Retire the registration of a permanently-blocked recipient, if any.
async fn retire_blocked<S: ReminderStore>(store: &S, recipient: &Recipient) {
  let Some(registration_id) = recipient.registration_id else {
    warn!(
      subscriber_id = %recipient.subscriber_id,
      "recipient blocked delivery; no registration to retire"
    );
    return;
  };

  match store.unregister_by_id(registration_id).await {
    Ok(_) => info!(
      subscriber_id = %recipient.subscriber_id,
      %registration_id,
      "recipient blocked delivery; registration auto-unregistered"
    ),
    Err(e) => {
      let error: herald_core::Error = e.into();
      warn!(
        subscriber_id = %recipient.subscriber_id,
        %registration_id,
        %error,
        "failed to auto-unregister blocked recipient"
      );
    }
  }
}
