//! Error types for the COW container reader.

use std::io;
use thiserror::Error;

/// Result type for COW container operations.
pub type CowResult<T> = Result<T, CowError>;

/// Errors that can occur while reading or writing a COW container.
#[derive(Debug, Error)]
pub enum CowError {
    /// Byte source error.
    #[error("storage error: {0}")]
    Storage(#[from] snapcow_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The header magic does not match the container magic.
    #[error("bad magic: {found:#010x}, expected {expected:#010x}")]
    BadMagic {
        /// Magic value read from the file.
        found: u32,
        /// The compiled-in container magic.
        expected: u32,
    },

    /// The header version does not match the compiled-in version.
    #[error("unsupported version {major}.{minor}, expected {expected_major}.{expected_minor}")]
    UnsupportedVersion {
        /// Major version read from the file.
        major: u16,
        /// Minor version read from the file.
        minor: u16,
        /// Supported major version.
        expected_major: u16,
        /// Supported minor version.
        expected_minor: u16,
    },

    /// The declared header size does not match the on-disk header layout.
    #[error("header size mismatch: declared {found}, expected {expected}")]
    HeaderSizeMismatch {
        /// Header size read from the file.
        found: u32,
        /// Size of the on-disk header layout.
        expected: u32,
    },

    /// An offset/length combination violates the container's structural
    /// invariants. Raised before any I/O is issued.
    #[error("range error: {message}")]
    Range {
        /// Description of the violated bound.
        message: String,
    },

    /// A stored SHA-256 digest disagrees with the computed digest.
    #[error("{region} checksum mismatch")]
    ChecksumMismatch {
        /// Which digest failed ("header" or "op table").
        region: &'static str,
    },

    /// An operation references an unregistered compression id.
    #[error("unknown compression type: {value}")]
    UnknownCompression {
        /// The compression byte read from the record.
        value: u8,
    },

    /// An operation carries an unrecognized type byte.
    #[error("unknown operation type: {value}")]
    UnknownOpType {
        /// The type byte read from the record.
        value: u8,
    },

    /// A codec refused its input or produced the wrong output length.
    #[error("decompression failed: {message}")]
    Decompress {
        /// Description of the codec failure.
        message: String,
    },
}

impl CowError {
    /// Creates a range error.
    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    /// Creates a decompression error.
    pub fn decompress(message: impl Into<String>) -> Self {
        Self::Decompress {
            message: message.into(),
        }
    }
}
