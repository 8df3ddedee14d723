//! Error types for byte source operations.

use std::io;
use thiserror::Error;

/// Result type for byte source operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading a byte source.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A full read hit end-of-source before the buffer was filled.
    #[error("read past end of source: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The total source size.
        size: u64,
    },
}
