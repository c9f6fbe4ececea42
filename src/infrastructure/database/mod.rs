//! Corpus storage
//!
//! - [`PostgresCorpusStore`]: the production store over a sqlx `PgPool`
//! - [`MemoryCorpusStore`]: an in-process store for tests and database-less runs

pub mod connection;
pub mod errors;
pub mod memory_store;
pub mod postgres_store;
pub mod sql;

pub use connection::DatabaseConnection;
pub use memory_store::MemoryCorpusStore;
pub use postgres_store::PostgresCorpusStore;
pub use sql::TableName;
