//! SQL schema for the Pakar SQLite store.
//!
//! Executed once at connection startup; `PRAGMA user_version` records the
//! schema revision so future migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    parent_id   TEXT REFERENCES categories(category_id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS characteristics (
    characteristic_id TEXT PRIMARY KEY,
    code              TEXT NOT NULL UNIQUE,
    question          TEXT NOT NULL,
    category_id       TEXT NOT NULL REFERENCES categories(category_id),
    status            TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'deleted'
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recommendations (
    recommendation_id TEXT PRIMARY KEY,
    code              TEXT NOT NULL UNIQUE,
    name              TEXT NOT NULL,
    description       TEXT,
    category_id       TEXT NOT NULL REFERENCES categories(category_id),
    status            TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'deleted'
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

-- Rules are listed in (created_at, rowid) order; best-match tie-breaking
-- depends on it.
CREATE TABLE IF NOT EXISTS rules (
    rule_id       TEXT PRIMARY KEY,
    code          TEXT NOT NULL UNIQUE,
    consequent_id TEXT NOT NULL REFERENCES recommendations(recommendation_id),
    category_id   TEXT REFERENCES categories(category_id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rule_antecedents (
    rule_id           TEXT NOT NULL REFERENCES rules(rule_id) ON DELETE CASCADE,
    characteristic_id TEXT NOT NULL REFERENCES characteristics(characteristic_id),
    PRIMARY KEY (rule_id, characteristic_id)
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    category_id TEXT NOT NULL REFERENCES categories(category_id),
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (user_id, category_id)
);

-- Consultation records are immutable; only whole rows are ever deleted.
CREATE TABLE IF NOT EXISTS consultations (
    record_id            TEXT PRIMARY KEY,
    subject_id           TEXT NOT NULL REFERENCES subjects(subject_id),
    selected_json        TEXT NOT NULL,   -- JSON array of characteristic ids
    recommendations_json TEXT NOT NULL,   -- JSON array of recommendation ids
    created_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS characteristics_category_idx ON characteristics(category_id);
CREATE INDEX IF NOT EXISTS recommendations_category_idx ON recommendations(category_id);
CREATE INDEX IF NOT EXISTS rules_order_idx              ON rules(created_at);
CREATE INDEX IF NOT EXISTS rules_consequent_idx         ON rules(consequent_id);
CREATE INDEX IF NOT EXISTS antecedents_char_idx         ON rule_antecedents(characteristic_id);
CREATE INDEX IF NOT EXISTS consultations_subject_idx    ON consultations(subject_id, created_at);

PRAGMA user_version = 1;
";
