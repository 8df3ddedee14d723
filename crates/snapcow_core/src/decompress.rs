//! Block decompressors: identity, gzip, brotli.
//!
//! Each codec consumes a [`ByteStream`] and emits exactly one
//! `block_size` of expanded bytes into a [`ByteSink`]. Anything else -
//! corrupt or truncated input, surplus or shortfall in the decoded
//! length, a refusing sink - is an error.

use crate::error::{CowError, CowResult};
use crate::format::Compression;
use crate::stream::{ByteSink, ByteStream};
use flate2::read::GzDecoder;
use std::io::Read;

const CHUNK_SIZE: usize = 4096;

/// Runs the codec selected by `kind` over one payload.
pub(crate) fn decompress(
    kind: Compression,
    stream: &mut dyn ByteStream,
    sink: &mut dyn ByteSink,
    block_size: u32,
) -> CowResult<()> {
    match kind {
        Compression::None => copy_raw(stream, sink, block_size),
        Compression::Gz => {
            let payload = slurp(stream)?;
            drain_decoder(GzDecoder::new(payload.as_slice()), sink, block_size)
        }
        Compression::Brotli => {
            let payload = slurp(stream)?;
            drain_decoder(
                brotli::Decompressor::new(payload.as_slice(), CHUNK_SIZE),
                sink,
                block_size,
            )
        }
    }
}

/// Identity codec: the payload already is the block.
fn copy_raw(stream: &mut dyn ByteStream, sink: &mut dyn ByteSink, block_size: u32) -> CowResult<()> {
    let expected = u64::from(block_size);
    let mut total = 0u64;
    let mut chunk = [0u8; CHUNK_SIZE];

    while total < expected {
        let want = chunk.len().min((expected - total) as usize);
        let n = stream.read(&mut chunk[..want])?;
        if n == 0 {
            break;
        }
        sink.receive(&chunk[..n])?;
        total += n as u64;
    }

    if stream.size() != expected {
        return Err(CowError::decompress(format!(
            "raw payload is {} bytes, block size is {expected}",
            stream.size()
        )));
    }
    if total != expected {
        return Err(CowError::decompress(format!(
            "copied {total} bytes, expected {expected}"
        )));
    }
    Ok(())
}

/// Reads a stream's full contents into memory.
///
/// Payloads encode at most one block, so this is bounded by the
/// compressed size of a single block.
fn slurp(stream: &mut dyn ByteStream) -> CowResult<Vec<u8>> {
    let mut payload = Vec::with_capacity(stream.size() as usize);
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        payload.extend_from_slice(&chunk[..n]);
    }
    Ok(payload)
}

/// Drains a decoder into the sink, enforcing the decoded-length contract.
fn drain_decoder<R: Read>(
    mut decoder: R,
    sink: &mut dyn ByteSink,
    block_size: u32,
) -> CowResult<()> {
    let expected = u64::from(block_size);
    let mut total = 0u64;
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        let n = decoder
            .read(&mut chunk)
            .map_err(|e| CowError::decompress(format!("corrupt stream: {e}")))?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > expected {
            return Err(CowError::decompress(format!(
                "decoded length exceeds block size {expected}"
            )));
        }
        sink.receive(&chunk[..n])?;
    }

    if total != expected {
        return Err(CowError::decompress(format!(
            "decoded {total} bytes, expected {expected}"
        )));
    }
    Ok(())
}
