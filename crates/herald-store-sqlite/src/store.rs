//! [`SqliteStore`] — the SQLite implementation of [`ReminderStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use herald_core::{
  happening::{Happening, NewHappening},
  registration::Registration,
  reminder::{DeliveryOutcome, Reminder, ReminderSchedule},
  store::{
    ActiveRegistration, CancelledHappening, DueReminder, ReminderStore,
  },
  subscriber::{NewSubscriber, Subscriber, SubscriberId, Topic},
};

use crate::{
  encode::{
    decode_dt, encode_dt, encode_kind, encode_outcome, encode_topic,
    encode_uuid, encode_venue, qualify, topic_column, RawHappening,
    RawRegistration, RawReminder, RawSubscriber,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Herald store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. SQLite
/// serialises writers, so the conditional UPDATE in [`Self::claim_reminder`]
/// is atomic for every dispatcher instance sharing the file.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch one registration row by its encoded id.
  /// Only called where the row is known to exist.
  fn select_registration(
    tx: &rusqlite::Transaction<'_>,
    registration_id: &str,
  ) -> rusqlite::Result<RawRegistration> {
    tx.query_row(
      &format!(
        "SELECT {} FROM registrations WHERE registration_id = ?1",
        RawRegistration::COLUMNS
      ),
      rusqlite::params![registration_id],
      |row| RawRegistration::from_row(row, 0),
    )
  }
}

/// Mark every pending reminder owned by `registration_id` as finalized with
/// no send owed.
fn suppress_pending(
  tx: &rusqlite::Transaction<'_>,
  registration_id: &str,
  now_str: &str,
) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE reminders SET state = 'suppressed', finalized_at = ?2
     WHERE registration_id = ?1 AND state = 'pending'",
    rusqlite::params![registration_id, now_str],
  )?;
  Ok(())
}

// ─── ReminderStore impl ──────────────────────────────────────────────────────

impl ReminderStore for SqliteStore {
  type Error = Error;

  // ── Subscribers ───────────────────────────────────────────────────────────

  async fn upsert_subscriber(&self, input: NewSubscriber) -> Result<Subscriber> {
    let id_str = input.subscriber_id.as_str().to_owned();
    let name = input.name;
    let handle = input.handle;
    let created_str = encode_dt(Utc::now());

    let raw: RawSubscriber = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO subscribers (subscriber_id, name, handle, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (subscriber_id) DO UPDATE SET
               name = excluded.name,
               handle = excluded.handle
             RETURNING {}",
            RawSubscriber::COLUMNS
          ),
          rusqlite::params![id_str, name, handle, created_str],
          |row| RawSubscriber::from_row(row, 0),
        )?)
      })
      .await?;

    raw.into_subscriber()
  }

  async fn get_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawSubscriber> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM subscribers WHERE subscriber_id = ?1",
                RawSubscriber::COLUMNS
              ),
              rusqlite::params![id_str],
              |row| RawSubscriber::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscriber::into_subscriber).transpose()
  }

  async fn set_topic_subscription(
    &self,
    id: SubscriberId,
    topic: Topic,
    enabled: bool,
  ) -> Result<Subscriber> {
    let id_str = id.as_str().to_owned();
    let column = topic_column(topic);

    let raw: Option<RawSubscriber> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE subscribers SET {column} = ?1
                 WHERE subscriber_id = ?2
                 RETURNING {}",
                RawSubscriber::COLUMNS
              ),
              rusqlite::params![enabled, id_str],
              |row| RawSubscriber::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_subscriber(),
      None => Err(Error::SubscriberNotFound(id)),
    }
  }

  async fn subscribers_for_topic(&self, topic: Topic) -> Result<Vec<Subscriber>> {
    let column = topic_column(topic);

    let raws: Vec<RawSubscriber> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM subscribers WHERE {column} = 1 ORDER BY created_at",
          RawSubscriber::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], |row| RawSubscriber::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscriber::into_subscriber).collect()
  }

  // ── Happenings ────────────────────────────────────────────────────────────

  async fn add_happening(&self, input: NewHappening) -> Result<Happening> {
    let happening = Happening {
      happening_id:      Uuid::new_v4(),
      title:             input.title,
      topic:             input.topic,
      venue:             input.venue,
      scheduled_at:      input.scheduled_at,
      location:          input.location,
      description:       input.description,
      organizer_contact: input.organizer_contact,
      cancelled:         false,
      created_at:        Utc::now(),
    };

    let id_str        = encode_uuid(happening.happening_id);
    let title         = happening.title.clone();
    let topic_str     = encode_topic(happening.topic).to_owned();
    let venue_str     = encode_venue(happening.venue).to_owned();
    let scheduled_str = encode_dt(happening.scheduled_at);
    let location      = happening.location.clone();
    let description   = happening.description.clone();
    let contact       = happening.organizer_contact.clone();
    let created_str   = encode_dt(happening.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO happenings (
             happening_id, title, topic, venue, scheduled_at,
             location, description, organizer_contact, cancelled, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
          rusqlite::params![
            id_str,
            title,
            topic_str,
            venue_str,
            scheduled_str,
            location,
            description,
            contact,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(happening)
  }

  async fn get_happening(&self, id: Uuid) -> Result<Option<Happening>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawHappening> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM happenings WHERE happening_id = ?1",
                RawHappening::COLUMNS
              ),
              rusqlite::params![id_str],
              |row| RawHappening::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawHappening::into_happening).transpose()
  }

  async fn list_upcoming_happenings(
    &self,
    topic: Option<Topic>,
    now: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<Happening>> {
    let now_str   = encode_dt(now);
    let topic_str = topic.map(encode_topic).map(str::to_owned);
    let limit_val = limit as i64;

    let raws: Vec<RawHappening> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(t) = topic_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM happenings
             WHERE scheduled_at > ?1 AND cancelled = 0 AND topic = ?2
             ORDER BY scheduled_at ASC
             LIMIT ?3",
            RawHappening::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![now_str, t, limit_val], |row| {
              RawHappening::from_row(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM happenings
             WHERE scheduled_at > ?1 AND cancelled = 0
             ORDER BY scheduled_at ASC
             LIMIT ?2",
            RawHappening::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![now_str, limit_val], |row| {
              RawHappening::from_row(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHappening::into_happening).collect()
  }

  async fn cancel_happening(&self, id: Uuid) -> Result<CancelledHappening> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let (raw_happening, raw_recipients) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let cancelled: Option<bool> = tx
          .query_row(
            "SELECT cancelled FROM happenings WHERE happening_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        match cancelled {
          None => return Ok(Err(Error::HappeningNotFound(id))),
          Some(true) => return Ok(Err(Error::AlreadyCancelled(id))),
          Some(false) => {}
        }

        // Capture the notification list while the rows are still active.
        let recipients = {
          let sql = format!(
            "SELECT {}, {} FROM registrations r
             JOIN subscribers s ON s.subscriber_id = r.subscriber_id
             WHERE r.happening_id = ?1 AND r.status = 'active'
             ORDER BY r.created_at",
            qualify(RawRegistration::COLUMNS, "r"),
            qualify(RawSubscriber::COLUMNS, "s"),
          );
          let mut stmt = tx.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params![id_str], |row| {
              Ok((
                RawRegistration::from_row(row, 0)?,
                RawSubscriber::from_row(row, 5)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        tx.execute(
          "UPDATE happenings SET cancelled = 1 WHERE happening_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "UPDATE registrations SET status = 'cancelled'
           WHERE happening_id = ?1 AND status = 'active'",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "UPDATE reminders SET state = 'suppressed', finalized_at = ?2
           WHERE state = 'pending' AND registration_id IN
             (SELECT registration_id FROM registrations WHERE happening_id = ?1)",
          rusqlite::params![id_str, now_str],
        )?;

        let happening = tx.query_row(
          &format!(
            "SELECT {} FROM happenings WHERE happening_id = ?1",
            RawHappening::COLUMNS
          ),
          rusqlite::params![id_str],
          |row| RawHappening::from_row(row, 0),
        )?;

        tx.commit()?;
        Ok(Ok((happening, recipients)))
      })
      .await??;

    let happening = raw_happening.into_happening()?;
    let recipients = raw_recipients
      .into_iter()
      .map(|(r, s)| {
        Ok(ActiveRegistration {
          registration: r.into_registration()?,
          subscriber:   s.into_subscriber()?,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(CancelledHappening { happening, recipients })
  }

  // ── Registrations ─────────────────────────────────────────────────────────

  async fn register(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
    schedule: ReminderSchedule,
  ) -> Result<(Registration, Vec<Reminder>)> {
    let sub_str = subscriber_id.as_str().to_owned();
    let hap_str = encode_uuid(happening_id);
    let now_str = encode_dt(Utc::now());

    let (raw_reg, raw_reminders) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The happening must exist and not be cancelled.
        let row: Option<(String, bool)> = tx
          .query_row(
            "SELECT scheduled_at, cancelled FROM happenings WHERE happening_id = ?1",
            rusqlite::params![hap_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let (scheduled_str, cancelled) = match row {
          None => return Ok(Err(Error::HappeningNotFound(happening_id))),
          Some(v) => v,
        };
        if cancelled {
          return Ok(Err(Error::AlreadyCancelledHappening(happening_id)));
        }
        let scheduled_at = match decode_dt(&scheduled_str) {
          Ok(v) => v,
          Err(e) => return Ok(Err(e)),
        };

        let known: Option<bool> = tx
          .query_row(
            "SELECT 1 FROM subscribers WHERE subscriber_id = ?1",
            rusqlite::params![sub_str],
            |_| Ok(true),
          )
          .optional()?;
        if known.is_none() {
          return Ok(Err(Error::SubscriberNotFound(SubscriberId::new(sub_str))));
        }

        // At most one row per (subscriber, happening), ever: reuse or
        // reactivate before inserting.
        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT registration_id, status FROM registrations
             WHERE subscriber_id = ?1 AND happening_id = ?2",
            rusqlite::params![sub_str, hap_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let registration_id_str = match existing {
          Some((id, status)) if status == "active" => {
            // Already registered: idempotent, no fresh obligations.
            let raw = SqliteStore::select_registration(&tx, &id)?;
            tx.commit()?;
            return Ok(Ok((raw, Vec::new())));
          }
          Some((id, _)) => {
            tx.execute(
              "UPDATE registrations SET status = 'active' WHERE registration_id = ?1",
              rusqlite::params![id],
            )?;
            id
          }
          None => {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO registrations
                 (registration_id, subscriber_id, happening_id, status, created_at)
               VALUES (?1, ?2, ?3, 'active', ?4)",
              rusqlite::params![id, sub_str, hap_str, now_str],
            )?;
            id
          }
        };

        // Materialize both obligations in the same transaction as the
        // registration write. Past-due fire times are kept: the selector
        // alone decides due-ness.
        let mut raw_reminders = Vec::new();
        for (kind, fire_at) in schedule.materialize(scheduled_at) {
          let reminder_id = encode_uuid(Uuid::new_v4());
          let kind_str    = encode_kind(kind).to_owned();
          let fire_str    = encode_dt(fire_at);
          tx.execute(
            "INSERT INTO reminders
               (reminder_id, registration_id, kind, fire_at, state, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            rusqlite::params![
              reminder_id,
              registration_id_str,
              kind_str,
              fire_str,
              now_str
            ],
          )?;
          raw_reminders.push(RawReminder {
            reminder_id,
            registration_id: registration_id_str.clone(),
            kind: kind_str,
            fire_at: fire_str,
            state: "pending".to_owned(),
            outcome: None,
            created_at: now_str.clone(),
            claimed_at: None,
            finalized_at: None,
          });
        }

        let raw = SqliteStore::select_registration(&tx, &registration_id_str)?;
        tx.commit()?;
        Ok(Ok((raw, raw_reminders)))
      })
      .await??;

    let registration = raw_reg.into_registration()?;
    let reminders = raw_reminders
      .into_iter()
      .map(RawReminder::into_reminder)
      .collect::<Result<Vec<_>>>()?;

    Ok((registration, reminders))
  }

  async fn unregister(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> Result<Registration> {
    let sub_str = subscriber_id.as_str().to_owned();
    let hap_str = encode_uuid(happening_id);
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT registration_id, status FROM registrations
             WHERE subscriber_id = ?1 AND happening_id = ?2",
            rusqlite::params![sub_str, hap_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let (reg_id, status) = match existing {
          None => {
            return Ok(Err(Error::NoSuchRegistration {
              subscriber: SubscriberId::new(sub_str),
              happening:  happening_id,
            }));
          }
          Some(v) => v,
        };

        // Already cancelled: idempotent no-op.
        if status != "cancelled" {
          tx.execute(
            "UPDATE registrations SET status = 'cancelled' WHERE registration_id = ?1",
            rusqlite::params![reg_id],
          )?;
          suppress_pending(&tx, &reg_id, &now_str)?;
        }

        let raw = SqliteStore::select_registration(&tx, &reg_id)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await??;

    raw.into_registration()
  }

  async fn unregister_by_id(&self, registration_id: Uuid) -> Result<Registration> {
    let id_str  = encode_uuid(registration_id);
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM registrations WHERE registration_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let status = match status {
          None => return Ok(Err(Error::RegistrationNotFound(registration_id))),
          Some(s) => s,
        };

        if status != "cancelled" {
          tx.execute(
            "UPDATE registrations SET status = 'cancelled' WHERE registration_id = ?1",
            rusqlite::params![id_str],
          )?;
          suppress_pending(&tx, &id_str, &now_str)?;
        }

        let raw = SqliteStore::select_registration(&tx, &id_str)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await??;

    raw.into_registration()
  }

  async fn get_registration(
    &self,
    subscriber_id: SubscriberId,
    happening_id: Uuid,
  ) -> Result<Option<Registration>> {
    let sub_str = subscriber_id.as_str().to_owned();
    let hap_str = encode_uuid(happening_id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM registrations
                 WHERE subscriber_id = ?1 AND happening_id = ?2",
                RawRegistration::COLUMNS
              ),
              rusqlite::params![sub_str, hap_str],
              |row| RawRegistration::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn get_registration_by_id(
    &self,
    registration_id: Uuid,
  ) -> Result<Option<Registration>> {
    let id_str = encode_uuid(registration_id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM registrations WHERE registration_id = ?1",
                RawRegistration::COLUMNS
              ),
              rusqlite::params![id_str],
              |row| RawRegistration::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn list_active_registrations(
    &self,
    happening_id: Uuid,
  ) -> Result<Vec<ActiveRegistration>> {
    let hap_str = encode_uuid(happening_id);

    let raws: Vec<(RawRegistration, RawSubscriber)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {}, {} FROM registrations r
           JOIN subscribers s ON s.subscriber_id = r.subscriber_id
           WHERE r.happening_id = ?1 AND r.status = 'active'
           ORDER BY r.created_at",
          qualify(RawRegistration::COLUMNS, "r"),
          qualify(RawSubscriber::COLUMNS, "s"),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![hap_str], |row| {
            Ok((
              RawRegistration::from_row(row, 0)?,
              RawSubscriber::from_row(row, 5)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(r, s)| {
        Ok(ActiveRegistration {
          registration: r.into_registration()?,
          subscriber:   s.into_subscriber()?,
        })
      })
      .collect()
  }

  // ── Reminders ─────────────────────────────────────────────────────────────

  async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
    let now_str = encode_dt(now);

    let raws: Vec<(RawReminder, RawSubscriber, RawHappening)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {}, {}, {} FROM reminders rm
           JOIN registrations r ON r.registration_id = rm.registration_id
           JOIN subscribers s   ON s.subscriber_id   = r.subscriber_id
           JOIN happenings h    ON h.happening_id    = r.happening_id
           WHERE rm.fire_at <= ?1 AND rm.state = 'pending'
             AND r.status = 'active' AND h.cancelled = 0
           ORDER BY rm.fire_at ASC",
          qualify(RawReminder::COLUMNS, "rm"),
          qualify(RawSubscriber::COLUMNS, "s"),
          qualify(RawHappening::COLUMNS, "h"),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![now_str], |row| {
            Ok((
              RawReminder::from_row(row, 0)?,
              RawSubscriber::from_row(row, 9)?,
              RawHappening::from_row(row, 16)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(rm, s, h)| {
        Ok(DueReminder {
          reminder:   rm.into_reminder()?,
          subscriber: s.into_subscriber()?,
          happening:  h.into_happening()?,
        })
      })
      .collect()
  }

  async fn claim_reminder(&self, reminder_id: Uuid) -> Result<bool> {
    let id_str  = encode_uuid(reminder_id);
    let now_str = encode_dt(Utc::now());

    // A single conditional UPDATE: the compare-and-set and the
    // registration/happening liveness checks are one atomic statement, so
    // concurrent dispatchers and concurrent cancellations can never both
    // win the same reminder.
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE reminders SET state = 'sent', claimed_at = ?2
           WHERE reminder_id = ?1 AND state = 'pending'
             AND EXISTS (
               SELECT 1 FROM registrations r
               JOIN happenings h ON h.happening_id = r.happening_id
               WHERE r.registration_id = reminders.registration_id
                 AND r.status = 'active' AND h.cancelled = 0)",
          rusqlite::params![id_str, now_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn finalize_outcome(
    &self,
    reminder_id: Uuid,
    outcome: DeliveryOutcome,
  ) -> Result<()> {
    let id_str      = encode_uuid(reminder_id);
    let outcome_str = encode_outcome(outcome).to_owned();
    let now_str     = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE reminders SET outcome = ?2, finalized_at = ?3
           WHERE reminder_id = ?1",
          rusqlite::params![id_str, outcome_str, now_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ReminderNotFound(reminder_id));
    }
    Ok(())
  }

  async fn pending_reminders(&self, registration_id: Uuid) -> Result<Vec<Reminder>> {
    let id_str = encode_uuid(registration_id);

    let raws: Vec<RawReminder> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM reminders
           WHERE registration_id = ?1 AND state = 'pending'
           ORDER BY fire_at ASC",
          RawReminder::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            RawReminder::from_row(row, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReminder::into_reminder).collect()
  }

  async fn get_reminder(&self, reminder_id: Uuid) -> Result<Option<Reminder>> {
    let id_str = encode_uuid(reminder_id);

    let raw: Option<RawReminder> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM reminders WHERE reminder_id = ?1",
                RawReminder::COLUMNS
              ),
              rusqlite::params![id_str],
              |row| RawReminder::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReminder::into_reminder).transpose()
  }
}
