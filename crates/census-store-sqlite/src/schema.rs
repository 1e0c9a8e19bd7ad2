//! SQL schema for the census SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per committed import. The next id is MAX(import_id) + 1, read
-- inside the writing transaction.
CREATE TABLE IF NOT EXISTS imports (
    import_id   INTEGER PRIMARY KEY,
    created_at  TEXT NOT NULL        -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS citizens (
    id          TEXT PRIMARY KEY,    -- server-generated UUID, never exposed
    import_id   INTEGER NOT NULL REFERENCES imports(import_id),
    citizen_id  INTEGER NOT NULL CHECK (citizen_id >= 0),
    town        TEXT NOT NULL,
    street      TEXT NOT NULL,
    building    TEXT NOT NULL,
    apartment   INTEGER NOT NULL CHECK (apartment >= 0),
    name        TEXT NOT NULL,
    birth_date  TEXT NOT NULL,       -- ISO 8601 calendar date
    gender      TEXT NOT NULL,       -- 'male' | 'female'
    UNIQUE (import_id, citizen_id)
);

-- Directed edges: a row (c, r) means r is in c's relatives. A symmetric
-- relation is stored as two rows.
CREATE TABLE IF NOT EXISTS relatives (
    import_id    INTEGER NOT NULL,
    citizen_id   INTEGER NOT NULL,
    relative_id  INTEGER NOT NULL,
    PRIMARY KEY (import_id, citizen_id, relative_id),
    CHECK (citizen_id != relative_id),
    FOREIGN KEY (import_id, citizen_id)
        REFERENCES citizens(import_id, citizen_id),
    FOREIGN KEY (import_id, relative_id)
        REFERENCES citizens(import_id, citizen_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS relatives_partner_idx
    ON relatives(import_id, relative_id);
CREATE INDEX IF NOT EXISTS citizens_town_idx
    ON citizens(import_id, town);

PRAGMA user_version = 1;
";
