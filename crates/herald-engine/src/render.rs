//! Notice rendering — pure functions from domain data to message payloads.
//!
//! No side effects and no store access: everything a notice says is derived
//! from the `Happening`/`Registration` rows handed in.

use chrono::{DateTime, Utc};

use herald_core::{
  happening::Happening,
  reminder::ReminderKind,
  store::DueReminder,
  transport::{AttendancePrompt, Notice},
};

/// `Tue 27 Jan, 19:00` — compact, weekday-first.
fn format_when(dt: DateTime<Utc>) -> String {
  dt.format("%a %e %b, %H:%M").to_string()
}

/// The reminder notice for a due obligation, selected by kind.
pub fn reminder(due: &DueReminder) -> Notice {
  match due.reminder.kind {
    ReminderKind::LongLead => long_lead(due),
    ReminderKind::Imminent => imminent(&due.happening),
  }
}

/// Day-scale reminder. Carries the accept/decline prompt: declining routes
/// back through unregistration, which suppresses the imminent reminder.
fn long_lead(due: &DueReminder) -> Notice {
  let h = &due.happening;
  Notice {
    body:   format!(
      "Reminder: {}\n{}\n\nAre you still planning to attend?",
      h.title,
      format_when(h.scheduled_at),
    ),
    prompt: Some(AttendancePrompt {
      registration_id: due.reminder.registration_id,
    }),
  }
}

/// Minute-scale reminder. Carries the location payload and the organizer
/// contact — everything needed to actually show up.
fn imminent(h: &Happening) -> Notice {
  Notice::plain(format!(
    "Starting soon: {}\n{}\n\nWhere: {}\nOrganizer: {}",
    h.title,
    format_when(h.scheduled_at),
    h.location,
    h.organizer_contact,
  ))
}

/// Out-of-band notice sent to every active registration when a happening is
/// cancelled.
pub fn cancellation(h: &Happening) -> Notice {
  Notice::plain(format!(
    "Cancelled: {}\n\n\"{}\" ({}) will not take place. Sorry for the \
     inconvenience — we hope to see you at another happening.",
    h.title,
    h.title,
    format_when(h.scheduled_at),
  ))
}

/// Announcement of a newly published happening, sent to topic subscribers.
pub fn announcement(h: &Happening) -> Notice {
  let mut body = format!(
    "New happening: {}\n{}\nWhere: {}",
    h.title,
    format_when(h.scheduled_at),
    h.location,
  );
  if let Some(description) = &h.description {
    body.push_str("\n\n");
    body.push_str(description);
  }
  Notice::plain(body)
}

/// Ad-hoc organizer message to a happening's active registrations.
pub fn organizer_message(h: &Happening, text: &str) -> Notice {
  Notice::plain(format!(
    "Message from the organizer of {}:\n\n{}",
    h.title, text
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone as _;
  use herald_core::{
    happening::Venue,
    reminder::{Reminder, ReminderState},
    subscriber::{Subscriber, SubscriberId, Topic, TopicSubscriptions},
  };
  use uuid::Uuid;

  fn happening() -> Happening {
    Happening {
      happening_id:      Uuid::new_v4(),
      title:             "Rust meetup".into(),
      topic:             Topic::Tech,
      venue:             Venue::InPerson,
      scheduled_at:      Utc.with_ymd_and_hms(2026, 1, 27, 19, 0, 0).unwrap(),
      location:          "Main hall".into(),
      description:       None,
      organizer_contact: "organizer@example.com".into(),
      cancelled:         false,
      created_at:        Utc::now(),
    }
  }

  fn due(kind: ReminderKind) -> DueReminder {
    let registration_id = Uuid::new_v4();
    DueReminder {
      reminder:   Reminder {
        reminder_id: Uuid::new_v4(),
        registration_id,
        kind,
        fire_at: Utc::now(),
        state: ReminderState::Pending,
        outcome: None,
        created_at: Utc::now(),
        claimed_at: None,
        finalized_at: None,
      },
      subscriber: Subscriber {
        subscriber_id: SubscriberId::new("alice"),
        name:          "Alice".into(),
        handle:        None,
        topics:        TopicSubscriptions::default(),
        created_at:    Utc::now(),
      },
      happening:  happening(),
    }
  }

  #[test]
  fn long_lead_carries_attendance_prompt() {
    let due = due(ReminderKind::LongLead);
    let notice = reminder(&due);

    let prompt = notice.prompt.expect("long-lead prompt");
    assert_eq!(prompt.registration_id, due.reminder.registration_id);
    assert!(notice.body.contains("Rust meetup"));
  }

  #[test]
  fn imminent_carries_location_and_contact() {
    let notice = reminder(&due(ReminderKind::Imminent));

    assert!(notice.prompt.is_none());
    assert!(notice.body.contains("Main hall"));
    assert!(notice.body.contains("organizer@example.com"));
  }

  #[test]
  fn cancellation_has_no_prompt() {
    let notice = cancellation(&happening());
    assert!(notice.prompt.is_none());
    assert!(notice.body.contains("Cancelled"));
  }

  #[test]
  fn announcement_includes_description_when_present() {
    let mut h = happening();
    h.description = Some("Monthly get-together".into());
    assert!(announcement(&h).body.contains("Monthly get-together"));
  }
}
