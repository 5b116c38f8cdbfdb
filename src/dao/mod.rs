/// Database model definitions.
pub mod models;
/// Poll persistence (sessions, responses, moderator credential).
pub mod poll_store;
/// Storage abstraction layer for database operations.
pub mod storage;
