//! Error types for opening SQLite sessions.
//!
//! Operations on an open session report [`HostError`] through the
//! [`ExtensionHost`](extload_core::ExtensionHost) trait; [`SqliteError`]
//! covers everything before that point.

use extload_core::HostError;
use thiserror::Error;

/// Errors that can occur while opening a session.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite refused to open or configure the database.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

/// Wraps an engine failure for the host trait.
pub(crate) fn engine(err: rusqlite::Error) -> HostError {
    HostError::Engine(Box::new(err))
}
