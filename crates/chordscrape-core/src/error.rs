use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The href is already present in the visited-page ledger.
    #[error("page already recorded as visited: {href}")]
    AlreadyRecorded { href: String },

    /// A record the store refuses to keep.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Returns `true` for a duplicate ledger entry, which callers log and
    /// ignore rather than abort on.
    pub fn is_already_recorded(&self) -> bool {
        matches!(self, Self::AlreadyRecorded { .. })
    }
}

/// Returns `true` when a SQLite error is a UNIQUE constraint conflict.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub type Result<T> = std::result::Result<T, Error>;
