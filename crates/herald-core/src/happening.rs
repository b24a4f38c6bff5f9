//! Happening — a scheduled occurrence subscribers can register for.
//!
//! Immutable once created except for the monotonic `cancelled` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscriber::Topic;

/// Where the happening takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
  Online,
  InPerson,
}

/// A scheduled occurrence. `scheduled_at` is stored in UTC — the single
/// canonical zone; presentation layers localise on render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Happening {
  pub happening_id:      Uuid,
  pub title:             String,
  pub topic:             Topic,
  pub venue:             Venue,
  pub scheduled_at:      DateTime<Utc>,
  pub location:          String,
  pub description:       Option<String>,
  pub organizer_contact: String,
  /// Monotonic: false → true, never reversed.
  pub cancelled:         bool,
  pub created_at:        DateTime<Utc>,
}

/// Input to [`crate::store::ReminderStore::add_happening`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewHappening {
  pub title:             String,
  pub topic:             Topic,
  pub venue:             Venue,
  pub scheduled_at:      DateTime<Utc>,
  pub location:          String,
  pub description:       Option<String>,
  pub organizer_contact: String,
}
