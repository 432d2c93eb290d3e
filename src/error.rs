use thiserror::Error;

pub type SeedResult<T> = Result<T, SeedError>;

/// Failures surfaced by the seeding pipeline.
///
/// Nothing is retried internally: a failed run is simply re-executed, which is
/// safe because every write is a keyed upsert.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Foreign-key, uniqueness or not-null violation reported by the database.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The database could not be reached or the connection dropped.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The connection definition is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SeedError {
    pub fn config(msg: impl Into<String>) -> Self {
        SeedError::Config(msg.into())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, SeedError::ConstraintViolation(_))
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, SeedError::ConnectionFailure(_))
    }
}
