//! Errors raised by [`BlobStore`](crate::blob::BlobStore) backends.

use snafu::{Backtrace, Snafu};

/// Failure of a single blob store operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// No object exists under the key.
    #[snafu(display("object not found: {key}"))]
    NotFound {
        /// The missing key.
        key: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },

    /// The key cannot address an object in this backend.
    #[snafu(display("invalid key {key:?}: {reason}"))]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },

    /// Filesystem failure while touching `key`.
    #[snafu(display("I/O error on {key}: {source}"))]
    Io {
        /// Key being read or written.
        key: String,
        /// Underlying error.
        source: std::io::Error,
        /// Captured at construction.
        backtrace: Backtrace,
    },

    /// Any other backend failure.
    #[snafu(display("storage backend error: {message}"))]
    Backend {
        /// Backend-provided description.
        message: String,
        /// Captured at construction.
        backtrace: Backtrace,
    },
}

impl StoreError {
    /// True for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Shorthand for store results.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
