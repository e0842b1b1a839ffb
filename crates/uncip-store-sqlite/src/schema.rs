//! SQL schema for the UNCIP SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    uid           TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- lower-cased
    password      TEXT,                   -- argon2 PHC or legacy plaintext
    role          TEXT NOT NULL,
    is_admin      INTEGER NOT NULL DEFAULT 0,
    school_id     TEXT,
    display_name  TEXT,
    created_at    TEXT NOT NULL
);

-- Mirror of the external identity provider.
CREATE TABLE IF NOT EXISTS identities (
    uid          TEXT PRIMARY KEY,
    email        TEXT NOT NULL UNIQUE,    -- lower-cased
    claims_json  TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS children (
    child_id      TEXT PRIMARY KEY,
    parent_id     TEXT,                   -- current ownership model
    guardians     TEXT,                   -- legacy model: JSON array or NULL
    school_id     TEXT,
    profile_json  TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alerts (
    alert_id            TEXT PRIMARY KEY,
    child_id            TEXT NOT NULL REFERENCES children(child_id) ON DELETE CASCADE,
    status              TEXT NOT NULL,    -- 'active' | 'resolved' | 'cancelled'
    alert_type          TEXT,
    type                TEXT,             -- legacy duplicate of alert_type
    description         TEXT,
    last_seen_location  TEXT,
    created_by          TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    resolved_at         TEXT,
    cancelled_at        TEXT
);

CREATE INDEX IF NOT EXISTS children_parent_idx ON children(parent_id);
CREATE INDEX IF NOT EXISTS children_school_idx ON children(school_id);
CREATE INDEX IF NOT EXISTS alerts_child_idx    ON alerts(child_id, status);

PRAGMA user_version = 1;
";
