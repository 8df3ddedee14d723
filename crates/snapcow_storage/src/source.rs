//! Byte source trait definition.

use crate::error::{StorageError, StorageResult};

/// A random-access byte source for COW container data.
///
/// Byte sources are **opaque byte stores**. They expose a total size and
/// positioned reads. The COW reader owns all format interpretation -
/// sources do not understand headers, operations, or payloads.
///
/// # Invariants
///
/// - `read_at` never reads past the current size
/// - Short reads are legal; callers needing a full buffer use
///   [`ByteSource::read_exact_at`]
/// - Sources must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemorySource`] - For testing
/// - [`super::FileSource`] - For on-disk containers
pub trait ByteSource: Send + Sync {
    /// Returns the total size of the source in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read. A short read is legal; a read
    /// at or beyond the current size returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    ///
    /// Loops over [`ByteSource::read_at`] until the buffer is filled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if end-of-source is reached
    /// before the buffer is filled, or any underlying I/O error.
    fn read_exact_at(&self, offset: u64, mut buf: &mut [u8]) -> StorageResult<()> {
        let requested = buf.len();
        let mut pos = offset;
        while !buf.is_empty() {
            let n = self.read_at(pos, buf)?;
            if n == 0 {
                return Err(StorageError::ReadPastEnd {
                    offset,
                    len: requested,
                    size: self.size()?,
                });
            }
            pos += n as u64;
            let rest = buf;
            buf = &mut rest[n..];
        }
        Ok(())
    }
}
