mod config;
mod error;
mod schema;
mod store;

pub use config::SqliteConfig;
pub use error::{SqliteDaoError, SqliteResult};
pub use store::SqlitePollStore;

use crate::dao::storage::StorageError;

impl From<SqliteDaoError> for StorageError {
    fn from(err: SqliteDaoError) -> Self {
        match err {
            SqliteDaoError::Corrupted { entity, detail } => StorageError::corrupted(entity, detail),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
