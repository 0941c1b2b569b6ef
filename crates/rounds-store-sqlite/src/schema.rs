//! SQL schema for the rounds SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS residents (
    resident_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    room        TEXT,
    created_at  TEXT NOT NULL
);

-- One row per grid event. Slot uniqueness is not enforced; readers keep the
-- most recently updated row per (resident_id, date, hour, facet).
CREATE TABLE IF NOT EXISTS events (
    event_id    TEXT PRIMARY KEY,
    resident_id TEXT NOT NULL,
    date        TEXT NOT NULL,   -- YYYY-MM-DD
    hour        INTEGER NOT NULL CHECK (hour BETWEEN 0 AND 23),
    facet       TEXT NOT NULL,   -- 'presence_stamp' | 'categorical_value' | 'free_text_note'
    value_json  TEXT NOT NULL,   -- tagged FacetValue
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at  TEXT NOT NULL
);

-- Every clinical category shares this table; `category` is the feed label.
CREATE TABLE IF NOT EXISTS records (
    record_id   TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    resident_id TEXT NOT NULL,
    date        TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    author      TEXT NOT NULL,
    content     TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS events_date_idx  ON events(date);
CREATE INDEX IF NOT EXISTS records_date_idx ON records(date, recorded_at);

PRAGMA user_version = 1;
";
