//! The delivery capability seam and the notice payloads handed to it.
//!
//! The raw transport (chat API, SMS gateway, webhook sink) lives outside the
//! engine. The engine only guarantees it *issues* each send obligation once;
//! the transport may still duplicate on its own network retries.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscriber::SubscriberId;

// ─── Notices ─────────────────────────────────────────────────────────────────

/// Affordance attached to long-lead reminders: the recipient can confirm or
/// decline attendance, keyed by their registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePrompt {
  pub registration_id: Uuid,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub body:   String,
  /// Present only on long-lead reminders.
  pub prompt: Option<AttendancePrompt>,
}

impl Notice {
  pub fn plain(body: impl Into<String>) -> Self {
    Self { body: body.into(), prompt: None }
  }
}

// ─── Delivery result ─────────────────────────────────────────────────────────

/// Outcome of one delivery attempt, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
  Delivered,
  /// The recipient has permanently blocked or deleted their identity.
  /// Triggers automatic unregistration upstream.
  Blocked,
  /// Timeout or network failure; carries a human-readable reason.
  Transient(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the raw message transport.
///
/// Implementations must not block indefinitely; callers additionally bound
/// every delivery with a timeout classified as a transient failure.
pub trait Transport: Send + Sync {
  fn deliver<'a>(
    &'a self,
    recipient: &'a SubscriberId,
    notice: &'a Notice,
  ) -> impl Future<Output = DeliveryResult> + Send + 'a;
}
