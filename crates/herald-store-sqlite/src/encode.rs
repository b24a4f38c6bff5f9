//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Closed enums are stored
//! as their serde discriminant strings. Timestamps are stored as fixed-width
//! RFC 3339 UTC strings (microsecond precision, `Z` suffix) so that
//! lexicographic column order matches chronological order — the due-selector
//! and claim SQL compare them with plain `<=`.

use chrono::{DateTime, SecondsFormat, Utc};
use herald_core::{
  happening::{Happening, Venue},
  registration::{Registration, RegistrationStatus},
  reminder::{DeliveryOutcome, Reminder, ReminderKind, ReminderState},
  subscriber::{Subscriber, SubscriberId, Topic, TopicSubscriptions},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Topic ───────────────────────────────────────────────────────────────────

pub fn encode_topic(t: Topic) -> &'static str {
  match t {
    Topic::Tech => "tech",
    Topic::Sport => "sport",
    Topic::Books => "books",
  }
}

pub fn decode_topic(s: &str) -> Result<Topic> {
  match s {
    "tech" => Ok(Topic::Tech),
    "sport" => Ok(Topic::Sport),
    "books" => Ok(Topic::Books),
    other => Err(Error::Decode(format!("unknown topic: {other:?}"))),
  }
}

/// The `subscribers` column holding the flag for a topic. Interpolated into
/// SQL; every value is a fixed identifier, never caller input.
pub fn topic_column(t: Topic) -> &'static str {
  match t {
    Topic::Tech => "notify_tech",
    Topic::Sport => "notify_sport",
    Topic::Books => "notify_books",
  }
}

// ─── Venue ───────────────────────────────────────────────────────────────────

pub fn encode_venue(v: Venue) -> &'static str {
  match v {
    Venue::Online => "online",
    Venue::InPerson => "in_person",
  }
}

pub fn decode_venue(s: &str) -> Result<Venue> {
  match s {
    "online" => Ok(Venue::Online),
    "in_person" => Ok(Venue::InPerson),
    other => Err(Error::Decode(format!("unknown venue: {other:?}"))),
  }
}

// ─── RegistrationStatus ──────────────────────────────────────────────────────

pub fn encode_status(s: RegistrationStatus) -> &'static str {
  match s {
    RegistrationStatus::Active => "active",
    RegistrationStatus::Cancelled => "cancelled",
  }
}

pub fn decode_status(s: &str) -> Result<RegistrationStatus> {
  match s {
    "active" => Ok(RegistrationStatus::Active),
    "cancelled" => Ok(RegistrationStatus::Cancelled),
    other => Err(Error::Decode(format!("unknown registration status: {other:?}"))),
  }
}

// ─── ReminderKind / ReminderState / DeliveryOutcome ──────────────────────────

pub fn encode_kind(k: ReminderKind) -> &'static str { k.discriminant() }

pub fn decode_kind(s: &str) -> Result<ReminderKind> {
  match s {
    "long_lead" => Ok(ReminderKind::LongLead),
    "imminent" => Ok(ReminderKind::Imminent),
    other => Err(Error::Decode(format!("unknown reminder kind: {other:?}"))),
  }
}

pub fn encode_state(s: ReminderState) -> &'static str {
  match s {
    ReminderState::Pending => "pending",
    ReminderState::Sent => "sent",
    ReminderState::Suppressed => "suppressed",
  }
}

pub fn decode_state(s: &str) -> Result<ReminderState> {
  match s {
    "pending" => Ok(ReminderState::Pending),
    "sent" => Ok(ReminderState::Sent),
    "suppressed" => Ok(ReminderState::Suppressed),
    other => Err(Error::Decode(format!("unknown reminder state: {other:?}"))),
  }
}

pub fn encode_outcome(o: DeliveryOutcome) -> &'static str {
  match o {
    DeliveryOutcome::Delivered => "delivered",
    DeliveryOutcome::Blocked => "blocked",
    DeliveryOutcome::TransientFailure => "transient_failure",
  }
}

pub fn decode_outcome(s: &str) -> Result<DeliveryOutcome> {
  match s {
    "delivered" => Ok(DeliveryOutcome::Delivered),
    "blocked" => Ok(DeliveryOutcome::Blocked),
    "transient_failure" => Ok(DeliveryOutcome::TransientFailure),
    other => Err(Error::Decode(format!("unknown delivery outcome: {other:?}"))),
  }
}

// ─── Join helper ─────────────────────────────────────────────────────────────

/// Prefix every column in a `COLUMNS` list with a table alias, for JOIN
/// queries where bare names would be ambiguous.
pub fn qualify(columns: &str, table: &str) -> String {
  columns
    .split(", ")
    .map(|c| format!("{table}.{c}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `subscribers` row.
pub struct RawSubscriber {
  pub subscriber_id: String,
  pub name:          String,
  pub handle:        Option<String>,
  pub notify_tech:   bool,
  pub notify_sport:  bool,
  pub notify_books:  bool,
  pub created_at:    String,
}

impl RawSubscriber {
  /// Column list matching the field order above.
  pub const COLUMNS: &'static str =
    "subscriber_id, name, handle, notify_tech, notify_sport, notify_books, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      subscriber_id: row.get(base)?,
      name:          row.get(base + 1)?,
      handle:        row.get(base + 2)?,
      notify_tech:   row.get(base + 3)?,
      notify_sport:  row.get(base + 4)?,
      notify_books:  row.get(base + 5)?,
      created_at:    row.get(base + 6)?,
    })
  }

  pub fn into_subscriber(self) -> Result<Subscriber> {
    Ok(Subscriber {
      subscriber_id: SubscriberId::new(self.subscriber_id),
      name:          self.name,
      handle:        self.handle,
      topics:        TopicSubscriptions {
        tech:  self.notify_tech,
        sport: self.notify_sport,
        books: self.notify_books,
      },
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `happenings` row.
pub struct RawHappening {
  pub happening_id:      String,
  pub title:             String,
  pub topic:             String,
  pub venue:             String,
  pub scheduled_at:      String,
  pub location:          String,
  pub description:       Option<String>,
  pub organizer_contact: String,
  pub cancelled:         bool,
  pub created_at:        String,
}

impl RawHappening {
  pub const COLUMNS: &'static str = "happening_id, title, topic, venue, \
     scheduled_at, location, description, organizer_contact, cancelled, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      happening_id:      row.get(base)?,
      title:             row.get(base + 1)?,
      topic:             row.get(base + 2)?,
      venue:             row.get(base + 3)?,
      scheduled_at:      row.get(base + 4)?,
      location:          row.get(base + 5)?,
      description:       row.get(base + 6)?,
      organizer_contact: row.get(base + 7)?,
      cancelled:         row.get(base + 8)?,
      created_at:        row.get(base + 9)?,
    })
  }

  pub fn into_happening(self) -> Result<Happening> {
    Ok(Happening {
      happening_id:      decode_uuid(&self.happening_id)?,
      title:             self.title,
      topic:             decode_topic(&self.topic)?,
      venue:             decode_venue(&self.venue)?,
      scheduled_at:      decode_dt(&self.scheduled_at)?,
      location:          self.location,
      description:       self.description,
      organizer_contact: self.organizer_contact,
      cancelled:         self.cancelled,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `registrations` row.
pub struct RawRegistration {
  pub registration_id: String,
  pub subscriber_id:   String,
  pub happening_id:    String,
  pub status:          String,
  pub created_at:      String,
}

impl RawRegistration {
  pub const COLUMNS: &'static str =
    "registration_id, subscriber_id, happening_id, status, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      registration_id: row.get(base)?,
      subscriber_id:   row.get(base + 1)?,
      happening_id:    row.get(base + 2)?,
      status:          row.get(base + 3)?,
      created_at:      row.get(base + 4)?,
    })
  }

  pub fn into_registration(self) -> Result<Registration> {
    Ok(Registration {
      registration_id: decode_uuid(&self.registration_id)?,
      subscriber_id:   SubscriberId::new(self.subscriber_id),
      happening_id:    decode_uuid(&self.happening_id)?,
      status:          decode_status(&self.status)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `reminders` row.
pub struct RawReminder {
  pub reminder_id:     String,
  pub registration_id: String,
  pub kind:            String,
  pub fire_at:         String,
  pub state:           String,
  pub outcome:         Option<String>,
  pub created_at:      String,
  pub claimed_at:      Option<String>,
  pub finalized_at:    Option<String>,
}

impl RawReminder {
  pub const COLUMNS: &'static str = "reminder_id, registration_id, kind, \
     fire_at, state, outcome, created_at, claimed_at, finalized_at";

  pub fn from_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      reminder_id:     row.get(base)?,
      registration_id: row.get(base + 1)?,
      kind:            row.get(base + 2)?,
      fire_at:         row.get(base + 3)?,
      state:           row.get(base + 4)?,
      outcome:         row.get(base + 5)?,
      created_at:      row.get(base + 6)?,
      claimed_at:      row.get(base + 7)?,
      finalized_at:    row.get(base + 8)?,
    })
  }

  pub fn into_reminder(self) -> Result<Reminder> {
    Ok(Reminder {
      reminder_id:     decode_uuid(&self.reminder_id)?,
      registration_id: decode_uuid(&self.registration_id)?,
      kind:            decode_kind(&self.kind)?,
      fire_at:         decode_dt(&self.fire_at)?,
      state:           decode_state(&self.state)?,
      outcome:         self.outcome.as_deref().map(decode_outcome).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
      claimed_at:      self.claimed_at.as_deref().map(decode_dt).transpose()?,
      finalized_at:    self.finalized_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
