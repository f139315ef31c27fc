//! Error Types
//!
//! This module defines the error taxonomy for store operations.
//!
//! Only two things can go wrong from a caller's perspective:
//! - The key is absent (or has already expired, which looks the same).
//! - The supplied TTL is not strictly positive.
//!
//! Note that [`TtlStore::ttl`](crate::TtlStore::ttl) does *not* use this
//! taxonomy: "no TTL" is an expected, frequent outcome rather than an
//! exceptional one, so it returns `None` instead of an error. That asymmetry
//! is deliberate.

use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key is absent, or its entry has expired and was lazily removed.
    /// Recoverable by the caller; never fatal.
    #[error("key not found")]
    KeyNotFound,

    /// The supplied TTL was zero or otherwise not strictly positive.
    /// A caller error; nothing is retried internally.
    #[error("ttl must be greater than zero")]
    InvalidTtl,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StoreError::KeyNotFound.to_string(), "key not found");
        assert_eq!(
            StoreError::InvalidTtl.to_string(),
            "ttl must be greater than zero"
        );
    }
}
