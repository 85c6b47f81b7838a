//! SQL schema for the roster store.
//!
//! Executed at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS controllers (
    id               INTEGER PRIMARY KEY,
    firebase_uid     TEXT UNIQUE,
    email            TEXT NOT NULL UNIQUE COLLATE NOCASE,
    given_name       TEXT NOT NULL,
    surnames         TEXT NOT NULL,
    name_key         TEXT NOT NULL UNIQUE,  -- normalized 'APELLIDOS NOMBRE'
    role             TEXT NOT NULL DEFAULT '',
    team             TEXT,
    license_number   TEXT NOT NULL DEFAULT '',
    is_admin         INTEGER NOT NULL DEFAULT 0,
    privacy_accepted INTEGER NOT NULL DEFAULT 0
);

-- Shifts are never updated; re-imports only add missing triples.
CREATE TABLE IF NOT EXISTS shifts (
    id            INTEGER PRIMARY KEY,
    controller_id INTEGER NOT NULL REFERENCES controllers(id),
    date          TEXT NOT NULL,            -- YYYY-MM-DD
    code          TEXT NOT NULL,
    UNIQUE (controller_id, date, code)
);

CREATE TABLE IF NOT EXISTS sessions (
    token         TEXT PRIMARY KEY,
    controller_id INTEGER NOT NULL REFERENCES controllers(id),
    created_at    TEXT NOT NULL,            -- RFC 3339 UTC
    expires_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS shifts_date_idx       ON shifts(date);
CREATE INDEX IF NOT EXISTS sessions_controller_idx ON sessions(controller_id);

PRAGMA user_version = 1;
";
