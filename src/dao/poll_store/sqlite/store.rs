use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

use futures::future::BoxFuture;
use rusqlite::{Connection, OptionalExtension, params};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{MODERATOR_PASSWORD_KEY, ResponseEntity, SessionEntity},
    poll_store::PollStore,
    storage::StorageResult,
};

use super::{
    config::SqliteConfig,
    error::{SqliteDaoError, SqliteResult},
    schema::ensure_schema,
};

/// SQLite-backed poll store.
///
/// A single connection sits behind a single mutex. Every trait call moves to a blocking
/// thread, takes the lock once for its whole unit of work and drops it before returning.
#[derive(Clone)]
pub struct SqlitePollStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePollStore {
    /// Open (or create) the database described by `config` and ensure the schema exists.
    pub fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let path = config.path.display().to_string();
        let conn = Connection::open(&config.path)
            .map_err(|source| SqliteDaoError::Open { path, source })?;

        conn.busy_timeout(config.busy_timeout)
            .map_err(|source| SqliteDaoError::Configure {
                setting: "busy_timeout",
                source,
            })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|source| SqliteDaoError::Configure {
                setting: "foreign_keys",
                source,
            })?;

        if !config.is_in_memory() {
            let mode: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .map_err(|source| SqliteDaoError::Configure {
                    setting: "journal_mode",
                    source,
                })?;
            if !mode.eq_ignore_ascii_case("wal") {
                return Err(SqliteDaoError::JournalMode { mode });
            }
        }

        ensure_schema(&conn)?;
        debug!(path = %config.path.display(), "SQLite schema ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database, mostly useful for tests.
    pub fn in_memory() -> SqliteResult<Self> {
        Self::open(&SqliteConfig::in_memory())
    }

    /// Run `work` against the connection on a blocking thread while holding the lock.
    fn with_conn<T, F>(&self, operation: &'static str, work: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> SqliteResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        Box::pin(async move {
            let outcome: SqliteResult<T> = tokio::task::spawn_blocking(move || {
                let guard = conn
                    .lock()
                    .map_err(|_| SqliteDaoError::LockPoisoned { operation })?;
                work(&guard)
            })
            .await
            .map_err(|source| SqliteDaoError::Worker { operation, source })?;
            outcome.map_err(Into::into)
        })
    }
}

impl PollStore for SqlitePollStore {
    fn create_session(
        &self,
        question: String,
        pin_candidates: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        self.with_conn("create session", move |conn| {
            for pin in pin_candidates {
                let taken: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM sessions WHERE pin = ?1)",
                        params![pin],
                        |row| row.get(0),
                    )
                    .map_err(SqliteDaoError::query("pin lookup"))?;
                if taken {
                    debug!(%pin, "candidate PIN already in use");
                    continue;
                }

                let session = SessionEntity {
                    id: Uuid::new_v4(),
                    pin,
                    question,
                    created_at: SystemTime::now(),
                };
                conn.execute(
                    "INSERT INTO sessions (id, pin, question, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        session.id.to_string(),
                        session.pin,
                        session.question,
                        format_timestamp(session.created_at)?,
                    ],
                )
                .map_err(SqliteDaoError::query("session insert"))?;
                return Ok(Some(session));
            }
            Ok(None)
        })
    }

    fn find_session_by_pin(
        &self,
        pin: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        self.with_conn("find session by pin", move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, pin, question, created_at FROM sessions WHERE pin = ?1",
                    params![pin],
                    read_session_row,
                )
                .optional()
                .map_err(SqliteDaoError::query("session lookup"))?;
            row.map(decode_session).transpose()
        })
    }

    fn insert_response(
        &self,
        session_id: Uuid,
        response: String,
    ) -> BoxFuture<'static, StorageResult<ResponseEntity>> {
        self.with_conn("insert response", move |conn| {
            let entity = ResponseEntity {
                id: Uuid::new_v4(),
                session_id,
                response,
                created_at: SystemTime::now(),
            };
            conn.execute(
                "INSERT INTO responses (id, session_id, response, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    entity.id.to_string(),
                    entity.session_id.to_string(),
                    entity.response,
                    format_timestamp(entity.created_at)?,
                ],
            )
            .map_err(SqliteDaoError::query("response insert"))?;
            Ok(entity)
        })
    }

    fn list_responses(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>> {
        self.with_conn("list responses", move |conn| {
            let mut statement = conn
                .prepare(
                    "SELECT id, session_id, response, created_at FROM responses
                     WHERE session_id = ?1
                     ORDER BY rowid DESC",
                )
                .map_err(SqliteDaoError::query("response listing"))?;

            let rows = statement
                .query_map(params![session_id.to_string()], |row| {
                    Ok(RawResponse {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        response: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .map_err(SqliteDaoError::query("response listing"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(SqliteDaoError::query("response listing"))?;

            rows.into_iter().map(decode_response).collect()
        })
    }

    fn moderator_password(&self) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.with_conn("read moderator password", |conn| {
            conn.query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![MODERATOR_PASSWORD_KEY],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(SqliteDaoError::query("config lookup"))
        })
    }

    fn set_moderator_password(&self, value: String) -> BoxFuture<'static, StorageResult<()>> {
        self.with_conn("update moderator password", move |conn| {
            conn.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![MODERATOR_PASSWORD_KEY, value],
            )
            .map_err(SqliteDaoError::query("config update"))?;
            Ok(())
        })
    }

    fn seed_moderator_password(&self, value: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.with_conn("seed moderator password", move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO config (key, value) VALUES (?1, ?2)",
                    params![MODERATOR_PASSWORD_KEY, value],
                )
                .map_err(SqliteDaoError::query("config seed"))?;
            Ok(inserted > 0)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.with_conn("health check", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(SqliteDaoError::query("health check"))?;
            Ok(())
        })
    }
}

struct RawSession {
    id: String,
    pin: String,
    question: Option<String>,
    created_at: Option<String>,
}

struct RawResponse {
    id: String,
    session_id: String,
    response: Option<String>,
    created_at: Option<String>,
}

fn read_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        pin: row.get(1)?,
        question: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn decode_session(raw: RawSession) -> SqliteResult<SessionEntity> {
    Ok(SessionEntity {
        id: parse_uuid("session", &raw.id)?,
        pin: raw.pin,
        question: raw.question.unwrap_or_default(),
        created_at: parse_timestamp("session", raw.created_at.as_deref())?,
    })
}

fn decode_response(raw: RawResponse) -> SqliteResult<ResponseEntity> {
    Ok(ResponseEntity {
        id: parse_uuid("response", &raw.id)?,
        session_id: parse_uuid("response", &raw.session_id)?,
        response: raw.response.unwrap_or_default(),
        created_at: parse_timestamp("response", raw.created_at.as_deref())?,
    })
}

fn parse_uuid(entity: &'static str, value: &str) -> SqliteResult<Uuid> {
    Uuid::parse_str(value).map_err(|err| SqliteDaoError::Corrupted {
        entity,
        detail: format!("invalid id `{value}`: {err}"),
    })
}

fn format_timestamp(time: SystemTime) -> SqliteResult<String> {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .map_err(|err| SqliteDaoError::Corrupted {
            entity: "timestamp",
            detail: err.to_string(),
        })
}

/// Missing timestamps on legacy rows fall back to the epoch instead of failing the read.
fn parse_timestamp(entity: &'static str, value: Option<&str>) -> SqliteResult<SystemTime> {
    let Some(value) = value else {
        return Ok(SystemTime::UNIX_EPOCH);
    };
    OffsetDateTime::parse(value, &Rfc3339)
        .map(SystemTime::from)
        .map_err(|err| SqliteDaoError::Corrupted {
            entity,
            detail: format!("invalid timestamp `{value}`: {err}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqlitePollStore {
        SqlitePollStore::in_memory().unwrap()
    }

    fn pins(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn session_is_retrievable_by_pin() {
        let store = store();
        let created = store
            .create_session("Favorite color?".into(), pins(&["123456"]))
            .await
            .unwrap()
            .unwrap();

        let by_pin = store.find_session_by_pin("123456".into()).await.unwrap();
        assert_eq!(by_pin.as_ref().map(|s| s.id), Some(created.id));
        assert_eq!(by_pin.unwrap().question, "Favorite color?");

        assert!(store.find_session_by_pin("654321".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn colliding_candidates_are_skipped() {
        let store = store();
        store
            .create_session("first".into(), pins(&["111111"]))
            .await
            .unwrap()
            .unwrap();

        let second = store
            .create_session("second".into(), pins(&["111111", "222222"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.pin, "222222");

        let exhausted = store
            .create_session("third".into(), pins(&["111111", "222222"]))
            .await
            .unwrap();
        assert!(exhausted.is_none());
    }

    #[tokio::test]
    async fn responses_are_listed_newest_first() {
        let store = store();
        let session = store
            .create_session("q".into(), pins(&["333333"]))
            .await
            .unwrap()
            .unwrap();
        for text in ["A", "B", "C"] {
            store.insert_response(session.id, text.into()).await.unwrap();
        }

        let listed: Vec<String> = store
            .list_responses(session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.response)
            .collect();
        assert_eq!(listed, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn responses_are_scoped_to_their_session() {
        let store = store();
        let first = store
            .create_session("one".into(), pins(&["444444"]))
            .await
            .unwrap()
            .unwrap();
        let second = store
            .create_session("two".into(), pins(&["555555"]))
            .await
            .unwrap()
            .unwrap();
        store.insert_response(first.id, "yes".into()).await.unwrap();

        assert_eq!(store.list_responses(first.id).await.unwrap().len(), 1);
        assert!(store.list_responses(second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = store();
        assert!(store.seed_moderator_password("first".into()).await.unwrap());
        assert!(!store.seed_moderator_password("second".into()).await.unwrap());
        assert_eq!(
            store.moderator_password().await.unwrap().as_deref(),
            Some("first")
        );

        store.set_moderator_password("third".into()).await.unwrap();
        assert_eq!(
            store.moderator_password().await.unwrap().as_deref(),
            Some("third")
        );
    }

    #[tokio::test]
    async fn health_check_succeeds_on_open_database() {
        assert!(store().health_check().await.is_ok());
    }
}
