//! Subscriber — the recipient identity and its topic subscriptions.
//!
//! A subscriber is created on first contact and never deleted; the row is
//! the evidence that lets re-creation stay idempotent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque, externally assigned recipient identity. The same value is handed
/// verbatim to the delivery transport as the recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubscriberId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SubscriberId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for SubscriberId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Topics ──────────────────────────────────────────────────────────────────

/// The closed set of announcement topics a happening belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
  Tech,
  Sport,
  Books,
}

/// Per-topic notification flags, independently togglable. All flags are on
/// when a subscriber is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscriptions {
  pub tech:  bool,
  pub sport: bool,
  pub books: bool,
}

impl Default for TopicSubscriptions {
  fn default() -> Self {
    Self { tech: true, sport: true, books: true }
  }
}

impl TopicSubscriptions {
  pub fn subscribed(&self, topic: Topic) -> bool {
    match topic {
      Topic::Tech => self.tech,
      Topic::Sport => self.sport,
      Topic::Books => self.books,
    }
  }

  pub fn set(&mut self, topic: Topic, enabled: bool) {
    match topic {
      Topic::Tech => self.tech = enabled,
      Topic::Sport => self.sport = enabled,
      Topic::Books => self.books = enabled,
    }
  }
}

// ─── Subscriber ──────────────────────────────────────────────────────────────

/// A known recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
  pub subscriber_id: SubscriberId,
  pub name:          String,
  pub handle:        Option<String>,
  pub topics:        TopicSubscriptions,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ReminderStore::upsert_subscriber`].
///
/// Re-contacting refreshes `name` and `handle` but preserves the stored
/// topic subscriptions.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
  pub subscriber_id: SubscriberId,
  pub name:          String,
  pub handle:        Option<String>,
}
