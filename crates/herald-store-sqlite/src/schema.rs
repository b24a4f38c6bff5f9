//! SQL schema for the Herald SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Subscribers are created on first contact and never deleted.
CREATE TABLE IF NOT EXISTS subscribers (
    subscriber_id TEXT PRIMARY KEY,   -- opaque transport recipient id
    name          TEXT NOT NULL,
    handle        TEXT,
    notify_tech   INTEGER NOT NULL DEFAULT 1,
    notify_sport  INTEGER NOT NULL DEFAULT 1,
    notify_books  INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS happenings (
    happening_id      TEXT PRIMARY KEY,
    title             TEXT NOT NULL,
    topic             TEXT NOT NULL,   -- 'tech' | 'sport' | 'books'
    venue             TEXT NOT NULL,   -- 'online' | 'in_person'
    scheduled_at      TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    location          TEXT NOT NULL,
    description       TEXT,
    organizer_contact TEXT NOT NULL,
    cancelled         INTEGER NOT NULL DEFAULT 0,   -- monotonic
    created_at        TEXT NOT NULL
);

-- One row per (subscriber, happening) forever; re-registration flips status
-- back to 'active' instead of inserting a duplicate.
CREATE TABLE IF NOT EXISTS registrations (
    registration_id TEXT PRIMARY KEY,
    subscriber_id   TEXT NOT NULL REFERENCES subscribers(subscriber_id),
    happening_id    TEXT NOT NULL REFERENCES happenings(happening_id),
    status          TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'cancelled'
    created_at      TEXT NOT NULL,
    UNIQUE (subscriber_id, happening_id)
);

-- Reminder obligations. 'state' is the claim coordination point:
-- 'pending' -> 'sent' only via the atomic claim, 'pending' -> 'suppressed'
-- only via cancellation propagation. Rows are never deleted.
CREATE TABLE IF NOT EXISTS reminders (
    reminder_id     TEXT PRIMARY KEY,
    registration_id TEXT NOT NULL REFERENCES registrations(registration_id),
    kind            TEXT NOT NULL,   -- 'long_lead' | 'imminent'
    fire_at         TEXT NOT NULL,
    state           TEXT NOT NULL DEFAULT 'pending',
    outcome         TEXT,            -- 'delivered' | 'blocked' | 'transient_failure'
    created_at      TEXT NOT NULL,
    claimed_at      TEXT,
    finalized_at    TEXT
);

CREATE INDEX IF NOT EXISTS reminders_due_idx
    ON reminders(fire_at) WHERE state = 'pending';
CREATE INDEX IF NOT EXISTS reminders_registration_idx
    ON reminders(registration_id);
CREATE INDEX IF NOT EXISTS registrations_happening_idx
    ON registrations(happening_id) WHERE status = 'active';
CREATE INDEX IF NOT EXISTS happenings_scheduled_idx
    ON happenings(scheduled_at) WHERE cancelled = 0;

PRAGMA user_version = 1;
";
