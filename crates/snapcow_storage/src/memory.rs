//! In-memory byte source for testing.

use crate::error::StorageResult;
use crate::source::ByteSource;

/// An in-memory byte source.
///
/// Stores all data in memory and is suitable for:
/// - Unit tests
/// - Corruption and truncation fixtures (mutate the buffer, reopen)
///
/// # Example
///
/// ```rust
/// use snapcow_storage::{ByteSource, InMemorySource};
///
/// let source = InMemorySource::with_data(vec![1, 2, 3, 4]);
/// assert_eq!(source.size().unwrap(), 4);
/// ```
#[derive(Debug, Default)]
pub struct InMemorySource {
    data: Vec<u8>,
}

impl InMemorySource {
    /// Creates a new empty in-memory source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory source over pre-existing bytes.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns a copy of all data in the source.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.clone()
    }
}

impl ByteSource for InMemorySource {
    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        if offset >= self.data.len() as u64 || buf.is_empty() {
            return Ok(0);
        }

        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}
