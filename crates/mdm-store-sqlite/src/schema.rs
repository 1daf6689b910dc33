//! SQL schema for the MDM SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS requests (
    request_id             TEXT PRIMARY KEY,   -- YYYYMMDDnnn
    id_prefix              TEXT NOT NULL,      -- YYYYMMDD
    requester_id           TEXT NOT NULL,
    requester_email        TEXT NOT NULL,
    requester_display_name TEXT NOT NULL,
    request_type           TEXT NOT NULL,
    region                 TEXT NOT NULL,
    status                 TEXT NOT NULL,
    submitted_data         TEXT NOT NULL,      -- JSON-encoded SubmittedData
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

-- Comments are strictly append-only; `seq` preserves insertion order.
CREATE TABLE IF NOT EXISTS comments (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id     TEXT NOT NULL REFERENCES requests(request_id) ON DELETE CASCADE,
    visibility     TEXT NOT NULL,   -- 'public' | 'internal'
    user_id        TEXT NOT NULL,
    user_name      TEXT NOT NULL,
    text           TEXT NOT NULL,
    is_ai_response INTEGER NOT NULL DEFAULT 0,
    recorded_at    TEXT NOT NULL
);

-- One row per status transition, in commit order.
CREATE TABLE IF NOT EXISTS history (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id           TEXT NOT NULL REFERENCES requests(request_id) ON DELETE CASCADE,
    status               TEXT NOT NULL,
    changed_by_user_id   TEXT NOT NULL,
    changed_by_user_name TEXT NOT NULL,
    recorded_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    name       TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS requests_prefix_idx    ON requests(id_prefix);
CREATE INDEX IF NOT EXISTS requests_requester_idx ON requests(requester_id);
CREATE INDEX IF NOT EXISTS requests_status_idx    ON requests(status);
CREATE INDEX IF NOT EXISTS comments_request_idx   ON comments(request_id);
CREATE INDEX IF NOT EXISTS history_request_idx    ON history(request_id);

PRAGMA user_version = 1;
";
