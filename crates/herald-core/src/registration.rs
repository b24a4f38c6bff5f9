//! Registration — binds one subscriber to one happening.
//!
//! At most one row ever exists per (subscriber, happening) pair;
//! re-registering after cancellation reactivates the existing row. Rows are
//! never deleted — history is the evidence idempotent dispatch relies on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscriber::SubscriberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
  Active,
  Cancelled,
}

impl RegistrationStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
  pub registration_id: Uuid,
  pub subscriber_id:   SubscriberId,
  pub happening_id:    Uuid,
  pub status:          RegistrationStatus,
  pub created_at:      DateTime<Utc>,
}
