//! Byte stream and sink seams for payload decompression.

use crate::error::CowResult;
use crate::reader::CowReader;
use std::io;

/// A one-way byte stream feeding a decompressor.
pub trait ByteStream {
    /// Reads up to `buf.len()` bytes. Returns `Ok(0)` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or violates the
    /// container's payload bounds.
    fn read(&mut self, buf: &mut [u8]) -> CowResult<usize>;

    /// Total number of bytes this stream will deliver.
    fn size(&self) -> u64;
}

/// A caller-supplied consumer for expanded payload bytes.
pub trait ByteSink {
    /// Accepts the next chunk of expanded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error to refuse the data; the refusal aborts
    /// decompression and propagates to the caller.
    fn receive(&mut self, data: &[u8]) -> CowResult<()>;
}

impl ByteSink for Vec<u8> {
    fn receive(&mut self, data: &[u8]) -> CowResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// A short-lived view over one operation's payload bytes.
///
/// Serves `min(buf.len(), remaining)` bytes per read through
/// [`CowReader::read_raw`], so every read stays inside the validated
/// payload region. Must not outlive the reader it borrows.
pub struct CowDataStream<'a> {
    reader: &'a CowReader,
    offset: u64,
    data_length: u64,
    remaining: u64,
}

impl<'a> CowDataStream<'a> {
    pub(crate) fn new(reader: &'a CowReader, offset: u64, data_length: u64) -> Self {
        Self {
            reader,
            offset,
            data_length,
            remaining: data_length,
        }
    }
}

impl ByteStream for CowDataStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> CowResult<usize> {
        let to_read = (buf.len() as u64).min(self.remaining) as usize;
        if to_read == 0 {
            return Ok(0);
        }

        let n = self.reader.read_raw(self.offset, &mut buf[..to_read])?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data_length
    }
}
