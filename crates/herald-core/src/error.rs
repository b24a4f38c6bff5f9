//! Error taxonomy for `herald-core`.
//!
//! Conflict variants (`AlreadyCancelled*`) are state conflicts, not
//! failures: callers surface them without retrying. Store backends convert
//! their own error types into this one so the engine and the API can branch
//! on the taxonomy regardless of backend.

use thiserror::Error;
use uuid::Uuid;

use crate::subscriber::SubscriberId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subscriber not found: {0}")]
  SubscriberNotFound(SubscriberId),

  #[error("happening not found: {0}")]
  HappeningNotFound(Uuid),

  #[error("registration not found: {0}")]
  RegistrationNotFound(Uuid),

  #[error("no registration for subscriber {subscriber} and happening {happening}")]
  NoSuchRegistration {
    subscriber: SubscriberId,
    happening:  Uuid,
  },

  #[error("reminder not found: {0}")]
  ReminderNotFound(Uuid),

  /// Registering against a happening whose `cancelled` flag is set.
  #[error("cannot register: happening {0} is cancelled")]
  AlreadyCancelledHappening(Uuid),

  /// Cancelling a happening twice. The flag is monotonic.
  #[error("happening {0} is already cancelled")]
  AlreadyCancelled(Uuid),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap an arbitrary backend failure.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
