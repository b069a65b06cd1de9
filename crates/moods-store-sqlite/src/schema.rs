//! SQL schema for the moods SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Local identity provider users. Emails are stored lowercased.
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,       -- argon2 PHC string
    disabled      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

-- Many-per-owner resources of every collection.
CREATE TABLE IF NOT EXISTS records (
    record_id   TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,         -- 'mood_entries' | 'emergency_contacts' | ...
    owner_id    TEXT NOT NULL,
    created_at  TEXT NOT NULL,         -- fixed-width RFC 3339 UTC; server-assigned
    sort_at     TEXT NOT NULL,         -- same format; the list ordering key
    payload     TEXT NOT NULL          -- JSON object
);

-- One row per (collection, owner); the owner id is the key.
CREATE TABLE IF NOT EXISTS singletons (
    collection  TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    payload     TEXT NOT NULL,
    PRIMARY KEY (collection, owner_id)
);

CREATE INDEX IF NOT EXISTS records_owner_sort_idx
    ON records(collection, owner_id, sort_at DESC);

PRAGMA user_version = 1;
";
