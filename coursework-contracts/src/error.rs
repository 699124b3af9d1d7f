use thiserror::Error;

/// Error taxonomy shared by every store-backed port. Not every component
/// can produce every variant (the journal can't `Conflict`, for instance)
/// but collapsing onto one enum keeps call sites' `match`es uniform.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique-constraint violation on insert. Callers log and continue;
    /// for the Ingestor this means "first writer wins".
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Git push, fsync, or DB lock timeout. Logged; never auto-retried.
    #[error("transient io error: {0}")]
    TransientIo(String),

    /// Payload or request shape the store layer rejects outright (e.g. an
    /// insert with unknown columns).
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
