pub mod builder;
pub mod sqlite;

pub use builder::*;
pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    // A stored enumerated column holding a value outside its vocabulary
    #[error(transparent)]
    Domain(#[from] crate::models::enums::DomainError),
}
