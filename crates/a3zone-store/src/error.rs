//! Error types for character persistence.

/// Errors from loading or saving a character.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The SQLite database could not be opened or migrated. The cause is
    /// kept as text because the failed open is cached for the life of
    /// the store.
    #[error("character db unavailable: {0}")]
    DbUnavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record was not valid character JSON.
    #[error("invalid character record: {0}")]
    Record(#[from] serde_json::Error),
}
