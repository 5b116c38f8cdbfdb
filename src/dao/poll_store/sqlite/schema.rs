use rusqlite::Connection;

use super::error::{SqliteDaoError, SqliteResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    pin TEXT UNIQUE,
    question TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS responses (
    id TEXT PRIMARY KEY,
    session_id TEXT,
    response TEXT,
    created_at TEXT,
    FOREIGN KEY(session_id) REFERENCES sessions(id)
);

CREATE INDEX IF NOT EXISTS idx_responses_session ON responses(session_id);

CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

/// Create every table and index when missing. Safe to run on each start.
pub fn ensure_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(SCHEMA)
        .map_err(|source| SqliteDaoError::Schema { source })
}
