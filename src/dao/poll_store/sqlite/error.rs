//! Error types shared by the SQLite storage implementation.

use thiserror::Error;

/// Convenient result alias returning [`SqliteDaoError`] failures.
pub type SqliteResult<T> = Result<T, SqliteDaoError>;

/// Failures that can occur while interacting with SQLite.
#[derive(Debug, Error)]
pub enum SqliteDaoError {
    /// The database file could not be opened or created.
    #[error("failed to open SQLite database `{path}`")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    /// A connection pragma could not be applied.
    #[error("failed to configure SQLite connection ({setting})")]
    Configure {
        setting: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// SQLite refused to switch to write-ahead logging.
    #[error("SQLite kept journal mode `{mode}` instead of `wal`")]
    JournalMode { mode: String },
    /// Table creation failed during initialization.
    #[error("failed to initialize SQLite schema")]
    Schema {
        #[source]
        source: rusqlite::Error,
    },
    /// A statement failed while running `operation`.
    #[error("SQLite {operation} failed")]
    Query {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// A previous holder of the connection lock panicked.
    #[error("SQLite connection lock poisoned during {operation}")]
    LockPoisoned { operation: &'static str },
    /// The blocking task running `operation` was cancelled or panicked.
    #[error("SQLite worker for {operation} did not complete")]
    Worker {
        operation: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
    /// A stored row holds a value that cannot be decoded.
    #[error("corrupted {entity} row: {detail}")]
    Corrupted { entity: &'static str, detail: String },
}

impl SqliteDaoError {
    /// Wrap a statement failure with the operation that triggered it.
    pub fn query(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| SqliteDaoError::Query { operation, source }
    }
}
