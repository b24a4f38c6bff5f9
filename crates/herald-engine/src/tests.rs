//! Engine and dispatcher tests against an in-memory store and a scripted
//! transport double.

use std::{
  collections::HashSet,
  future::Future,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{DateTime, Duration as Lead, Utc};
use herald_core::{
  happening::{Happening, NewHappening, Venue},
  registration::RegistrationStatus,
  reminder::{DeliveryOutcome, ReminderState},
  store::ReminderStore,
  subscriber::{NewSubscriber, Subscriber, SubscriberId, Topic},
  transport::{DeliveryResult, Notice, Transport},
};
use herald_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{Dispatcher, Engine, EngineConfig};

// ─── Transport double ────────────────────────────────────────────────────────

/// Records every successful delivery; fails on demand per recipient.
#[derive(Default)]
struct MockTransport {
  sent:      Mutex<Vec<(SubscriberId, Notice)>>,
  blocked:   Mutex<HashSet<String>>,
  transient: Mutex<HashSet<String>>,
  delay:     Option<Duration>,
}

impl MockTransport {
  fn delayed(delay: Duration) -> Self {
    Self { delay: Some(delay), ..Self::default() }
  }

  fn block(&self, id: &str) {
    self.blocked.lock().unwrap().insert(id.to_owned());
  }

  fn fail_transiently(&self, id: &str) {
    self.transient.lock().unwrap().insert(id.to_owned());
  }

  fn sent_count(&self) -> usize { self.sent.lock().unwrap().len() }

  fn deliveries_to(&self, id: &str) -> Vec<Notice> {
    self
      .sent
      .lock()
      .unwrap()
      .iter()
      .filter(|(to, _)| to.as_str() == id)
      .map(|(_, n)| n.clone())
      .collect()
  }
}

impl Transport for MockTransport {
  fn deliver<'a>(
    &'a self,
    recipient: &'a SubscriberId,
    notice: &'a Notice,
  ) -> impl Future<Output = DeliveryResult> + Send + 'a {
    async move {
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      if self.blocked.lock().unwrap().contains(recipient.as_str()) {
        return DeliveryResult::Blocked;
      }
      if self.transient.lock().unwrap().contains(recipient.as_str()) {
        return DeliveryResult::Transient("scripted failure".into());
      }
      self
        .sent
        .lock()
        .unwrap()
        .push((recipient.clone(), notice.clone()));
      DeliveryResult::Delivered
    }
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

type TestEngine = Engine<SqliteStore, MockTransport>;

async fn engine_with(transport: MockTransport) -> (SqliteStore, Arc<MockTransport>, TestEngine) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let transport = Arc::new(transport);
  let engine =
    Engine::new(store.clone(), Arc::clone(&transport), EngineConfig::default());
  (store, transport, engine)
}

async fn engine() -> (SqliteStore, Arc<MockTransport>, TestEngine) {
  engine_with(MockTransport::default()).await
}

fn dispatcher(engine: &TestEngine) -> Dispatcher<SqliteStore, MockTransport> {
  Dispatcher::new(engine.clone(), Duration::from_secs(60))
}

async fn subscriber(engine: &TestEngine, id: &str) -> Subscriber {
  engine
    .ensure_subscriber(NewSubscriber {
      subscriber_id: SubscriberId::new(id),
      name:          format!("Subscriber {id}"),
      handle:        None,
    })
    .await
    .unwrap()
}

/// Insert a happening directly, without the publication announcement.
async fn quiet_happening(
  store: &SqliteStore,
  scheduled_at: DateTime<Utc>,
) -> Happening {
  store
    .add_happening(NewHappening {
      title: "Rust meetup".into(),
      topic: Topic::Tech,
      venue: Venue::InPerson,
      scheduled_at,
      location: "Main hall, 4th floor".into(),
      description: None,
      organizer_contact: "organizer@example.com".into(),
    })
    .await
    .unwrap()
}

// ─── Reminder pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn ticks_deliver_each_reminder_exactly_once() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  let reg = engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();

  // Nothing due a week out.
  let summary = d.tick(Utc::now()).await.unwrap();
  assert_eq!(summary.selected, 0);

  // Just past the long-lead fire time: one delivery, with the prompt.
  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  let summary = d.tick(t1).await.unwrap();
  assert_eq!(summary.selected, 1);
  assert_eq!(summary.delivered, 1);

  let notices = transport.deliveries_to("alice");
  assert_eq!(notices.len(), 1);
  let prompt = notices[0].prompt.as_ref().expect("long-lead prompt");
  assert_eq!(prompt.registration_id, reg.registration_id);

  // A second tick a moment later must not re-notify.
  let summary = d.tick(t1 + Lead::minutes(2)).await.unwrap();
  assert_eq!(summary.selected, 0);
  assert_eq!(transport.sent_count(), 1);

  // Just past the imminent fire time: the second delivery, with location.
  let t2 = scheduled_at - Lead::minutes(10);
  let summary = d.tick(t2).await.unwrap();
  assert_eq!(summary.delivered, 1);

  let notices = transport.deliveries_to("alice");
  assert_eq!(notices.len(), 2);
  assert!(notices[1].prompt.is_none());
  assert!(notices[1].body.contains("Main hall"));
}

#[tokio::test]
async fn unregister_before_any_tick_yields_zero_deliveries() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();
  engine
    .unregister(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();

  // No instant, however late, sees anything due for the cancelled row.
  for offset in [Lead::hours(0), Lead::days(6), Lead::days(8)] {
    let summary = d.tick(Utc::now() + offset).await.unwrap();
    assert_eq!(summary.selected, 0);
  }
  assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn decline_suppresses_the_imminent_reminder() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  let reg = engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();

  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  d.tick(t1).await.unwrap();
  assert_eq!(transport.sent_count(), 1);

  // The recipient declines from the long-lead prompt.
  let declined = engine.decline_reminder(reg.registration_id).await.unwrap();
  assert_eq!(declined.status, RegistrationStatus::Cancelled);

  // The imminent reminder never fires.
  let t2 = scheduled_at - Lead::minutes(10);
  let summary = d.tick(t2).await.unwrap();
  assert_eq!(summary.selected, 0);
  assert_eq!(transport.sent_count(), 1);
}

#[tokio::test]
async fn blocked_recipient_is_retired_after_reminder_attempt() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  let reg = engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();
  transport.block("alice");

  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  let summary = d.tick(t1).await.unwrap();
  assert_eq!(summary.blocked, 1);

  // The outcome is recorded, the registration retired, and the still-pending
  // imminent obligation suppressed with it.
  let reminders = store.pending_reminders(reg.registration_id).await.unwrap();
  assert!(reminders.is_empty());
  let registration = store
    .get_registration_by_id(reg.registration_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(registration.status, RegistrationStatus::Cancelled);

  let summary = d.tick(scheduled_at).await.unwrap();
  assert_eq!(summary.selected, 0);
  assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn transient_failure_is_terminal_for_that_reminder() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  let reg = engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();
  transport.fail_transiently("alice");

  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  let summary = d.tick(t1).await.unwrap();
  assert_eq!(summary.transient, 1);

  // Claimed, not sent, recorded as a transient failure — and never retried.
  let reminders = store.pending_reminders(reg.registration_id).await.unwrap();
  assert_eq!(reminders.len(), 1); // only the imminent one remains pending

  let summary = d.tick(t1 + Lead::minutes(5)).await.unwrap();
  assert_eq!(summary.selected, 0);
  assert_eq!(transport.sent_count(), 0);

  // The registration survives: a transient failure is not a blocked one.
  let registration = store
    .get_registration_by_id(reg.registration_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(registration.status, RegistrationStatus::Active);
}

#[tokio::test]
async fn delivery_timeout_classifies_as_transient() {
  let (store, _transport, engine) = {
    let (store, transport, _) = engine_with(MockTransport::delayed(
      Duration::from_millis(200),
    ))
    .await;
    let engine = Engine::new(
      store.clone(),
      Arc::clone(&transport),
      EngineConfig {
        delivery_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
      },
    );
    (store, transport, engine)
  };
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();

  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  let summary = d.tick(t1).await.unwrap();
  assert_eq!(summary.transient, 1);
  assert_eq!(summary.delivered, 0);
}

// ─── Happening cancellation ──────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_notifies_everyone_and_silences_reminders() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  for i in 0..5 {
    subscriber(&engine, &format!("sub-{i}")).await;
    engine
      .register(SubscriberId::new(format!("sub-{i}")), hap.happening_id)
      .await
      .unwrap();
  }

  let (cancelled, tally) = engine.cancel_happening(hap.happening_id).await.unwrap();
  assert!(cancelled.cancelled);
  assert_eq!(tally.delivered, 5);

  for i in 0..5 {
    let notices = transport.deliveries_to(&format!("sub-{i}"));
    assert_eq!(notices.len(), 1);
    assert!(notices[0].body.contains("Cancelled"));
  }

  // All reminder obligations were suppressed before the broadcast started:
  // no later tick delivers anything.
  for offset in [Lead::days(6), Lead::days(7), Lead::days(8)] {
    let summary = d.tick(Utc::now() + offset).await.unwrap();
    assert_eq!(summary.selected, 0);
  }
  assert_eq!(transport.sent_count(), 5);

  let err = engine.cancel_happening(hap.happening_id).await.unwrap_err();
  assert!(matches!(err, herald_core::Error::AlreadyCancelled(_)));
}

// ─── Broadcast fan-out ───────────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_isolates_the_blocked_recipient() {
  let (store, transport, engine) = engine().await;

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  for i in 0..5 {
    subscriber(&engine, &format!("sub-{i}")).await;
    engine
      .register(SubscriberId::new(format!("sub-{i}")), hap.happening_id)
      .await
      .unwrap();
  }
  transport.block("sub-2");

  let tally = engine
    .announce(hap.happening_id, "Doors open 30 minutes early.")
    .await
    .unwrap();
  assert_eq!(tally.delivered, 4);
  assert_eq!(tally.blocked, 1);
  assert_eq!(tally.transient, 0);

  // The other four still received the message.
  for i in [0usize, 1, 3, 4] {
    assert_eq!(transport.deliveries_to(&format!("sub-{i}")).len(), 1);
  }

  // The blocked recipient's registration was auto-unregistered.
  let blocked_reg = store
    .get_registration(SubscriberId::new("sub-2"), hap.happening_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(blocked_reg.status, RegistrationStatus::Cancelled);

  let active = store
    .list_active_registrations(hap.happening_id)
    .await
    .unwrap();
  assert_eq!(active.len(), 4);
}

#[tokio::test]
async fn announce_on_unknown_happening_errors() {
  let (_, _, engine) = engine().await;
  let err = engine.announce(Uuid::new_v4(), "hello").await.unwrap_err();
  assert!(matches!(err, herald_core::Error::HappeningNotFound(_)));
}

// ─── Publication announcements ───────────────────────────────────────────────

#[tokio::test]
async fn publishing_announces_to_topic_subscribers_only() {
  let (_, transport, engine) = engine().await;

  subscriber(&engine, "alice").await;
  subscriber(&engine, "bob").await;
  engine
    .set_topic_subscription(SubscriberId::new("bob"), Topic::Tech, false)
    .await
    .unwrap();

  let (happening, tally) = engine
    .publish_happening(NewHappening {
      title: "Rust meetup".into(),
      topic: Topic::Tech,
      venue: Venue::Online,
      scheduled_at: Utc::now() + Lead::days(3),
      location: "https://meet.example.com/rust".into(),
      description: Some("Monthly get-together".into()),
      organizer_contact: "organizer@example.com".into(),
    })
    .await
    .unwrap();

  assert_eq!(tally.delivered, 1);
  let notices = transport.deliveries_to("alice");
  assert_eq!(notices.len(), 1);
  assert!(notices[0].body.contains("New happening"));
  assert!(notices[0].body.contains(&happening.title));
  assert!(transport.deliveries_to("bob").is_empty());
}

// ─── Outcome audit ───────────────────────────────────────────────────────────

#[tokio::test]
async fn every_terminal_outcome_is_queryable() {
  let (store, transport, engine) = engine().await;
  let d = dispatcher(&engine);

  let scheduled_at = Utc::now() + Lead::days(7);
  let hap = quiet_happening(&store, scheduled_at).await;
  subscriber(&engine, "alice").await;
  let reg = engine
    .register(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();
  let pending = store.pending_reminders(reg.registration_id).await.unwrap();
  let long_lead = pending
    .iter()
    .find(|r| r.fire_at < scheduled_at - Lead::hours(1))
    .unwrap()
    .reminder_id;

  let t1 = scheduled_at - Lead::hours(24) + Lead::minutes(1);
  d.tick(t1).await.unwrap();
  assert_eq!(transport.sent_count(), 1);

  let sent = store.get_reminder(long_lead).await.unwrap().unwrap();
  assert_eq!(sent.state, ReminderState::Sent);
  assert_eq!(sent.outcome, Some(DeliveryOutcome::Delivered));
  assert!(sent.claimed_at.is_some());
  assert!(sent.finalized_at.is_some());

  // Suppression is distinguishable from delivery in the record.
  engine
    .unregister(SubscriberId::new("alice"), hap.happening_id)
    .await
    .unwrap();
  let imminent = pending
    .iter()
    .find(|r| r.reminder_id != long_lead)
    .unwrap()
    .reminder_id;
  let suppressed = store.get_reminder(imminent).await.unwrap().unwrap();
  assert_eq!(suppressed.state, ReminderState::Suppressed);
  assert_eq!(suppressed.outcome, None);
}
