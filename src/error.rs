//! Cache error types.
//!
//! The public facade never surfaces these: synchronous operations return
//! values or absence, background operations return completion flags. The one
//! fallible public call is [`TieredCache::init`](crate::TieredCache::init),
//! which can fail while creating the cache directories.

use thiserror::Error;

/// Errors produced while operating the cache directories and journal.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A filesystem call failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be used as a file name or journal field. Produced by
    /// key validation on every facade operation; the facade logs it and
    /// drops the operation instead of surfacing it.
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CacheError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_invalid_key_display() {
        let err = CacheError::InvalidKey("a/b".to_string());
        assert!(err.to_string().contains("a/b"));
    }
}
