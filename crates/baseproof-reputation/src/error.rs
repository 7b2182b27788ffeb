//! Error types for reputation and storage operations.

use thiserror::Error;

/// Errors returned by the reputation ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReputationError {
    /// Sender and recipient are the same identity.
    #[error("Cannot vouch for yourself")]
    SelfVouch,

    /// The sender has no profile.
    #[error("Sender profile not found: {0}")]
    SenderNotFound(String),

    /// The recipient has no profile.
    #[error("Recipient profile not found: {0}")]
    RecipientNotFound(String),

    /// The sender's daily or weekly vouch quota is exhausted.
    #[error("Vouch rate limit exceeded ({daily_remaining} left today, {weekly_remaining} left this week)")]
    RateLimitExceeded {
        /// Vouches still available in the current day.
        daily_remaining: u32,
        /// Vouches still available in the current week.
        weekly_remaining: u32,
    },

    /// The storage layer could not isolate the update; the caller may retry.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    /// Malformed identity key.
    #[error("Invalid profile id: {0}")]
    InvalidProfileId(String),

    /// Vouch payload rejected before any state was touched.
    #[error("Invalid vouch: {0}")]
    InvalidVouch(String),

    /// Non-conflict storage failure.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ReputationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => ReputationError::StorageConflict(reason),
            other => ReputationError::Storage(other),
        }
    }
}

/// Errors raised by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A concurrent writer won; the operation had no effect.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A lock was poisoned by a panicking writer.
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for reputation operations.
pub type Result<T> = std::result::Result<T, ReputationError>;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
