//! Error type for `herald-store-sqlite`.

use herald_core::subscriber::SubscriberId;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held a value outside its closed set.
  #[error("unrecognised stored value: {0}")]
  Decode(String),

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

  #[error("cannot register: happening {0} is cancelled")]
  AlreadyCancelledHappening(Uuid),

  #[error("happening {0} is already cancelled")]
  AlreadyCancelled(Uuid),
}

impl From<Error> for herald_core::Error {
  fn from(e: Error) -> Self {
    use herald_core::Error as Core;
    match e {
      Error::SubscriberNotFound(id) => Core::SubscriberNotFound(id),
      Error::HappeningNotFound(id) => Core::HappeningNotFound(id),
      Error::RegistrationNotFound(id) => Core::RegistrationNotFound(id),
      Error::NoSuchRegistration { subscriber, happening } => {
        Core::NoSuchRegistration { subscriber, happening }
      }
      Error::ReminderNotFound(id) => Core::ReminderNotFound(id),
      Error::AlreadyCancelledHappening(id) => {
        Core::AlreadyCancelledHappening(id)
      }
      Error::AlreadyCancelled(id) => Core::AlreadyCancelled(id),
      other => Core::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
