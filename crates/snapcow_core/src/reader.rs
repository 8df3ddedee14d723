//! COW container reader facade.

use crate::decompress;
use crate::error::{CowError, CowResult};
use crate::format::{
    sha256, CowHeader, CowOperation, COW_MAGIC, COW_VERSION_MAJOR, COW_VERSION_MINOR, HEADER_SIZE,
    OP_SIZE,
};
use crate::iter::CowOpIter;
use crate::stream::{ByteSink, CowDataStream};
use snapcow_storage::ByteSource;

/// A validated view over one COW container.
///
/// A reader binds to its byte source exactly once, at [`CowReader::parse`],
/// and is read-only afterwards. It is single-caller by contract: no
/// internal locking, no concurrent reads through one instance.
///
/// Every offset and length in the container is untrusted. `parse`
/// validates the header's self-description and the op-table range;
/// [`CowReader::read_raw`] re-validates each payload read against the
/// region between header and op table, so a hostile op record cannot
/// pull bytes from outside the payload region.
pub struct CowReader {
    source: Box<dyn ByteSource>,
    header: CowHeader,
    file_size: u64,
}

impl CowReader {
    /// Binds a byte source and validates the container header.
    ///
    /// # Errors
    ///
    /// - [`CowError::Storage`] - the source failed, or the file is
    ///   shorter than the header
    /// - [`CowError::BadMagic`] - magic mismatch
    /// - [`CowError::UnsupportedVersion`] - version mismatch
    /// - [`CowError::HeaderSizeMismatch`] - declared header size is not
    ///   the on-disk header size
    /// - [`CowError::Range`] - op table lies outside the file, or its
    ///   size is not a whole number of records
    /// - [`CowError::ChecksumMismatch`] - header digest mismatch
    pub fn parse(source: Box<dyn ByteSource>) -> CowResult<Self> {
        let file_size = source.size()?;

        let mut raw = [0u8; HEADER_SIZE];
        source.read_exact_at(0, &mut raw)?;
        let header = CowHeader::decode(&raw)?;

        if header.magic != COW_MAGIC {
            return Err(CowError::BadMagic {
                found: header.magic,
                expected: COW_MAGIC,
            });
        }
        if header.major_version != COW_VERSION_MAJOR || header.minor_version != COW_VERSION_MINOR {
            return Err(CowError::UnsupportedVersion {
                major: header.major_version,
                minor: header.minor_version,
                expected_major: COW_VERSION_MAJOR,
                expected_minor: COW_VERSION_MINOR,
            });
        }
        if header.header_size != HEADER_SIZE as u32 {
            return Err(CowError::HeaderSizeMismatch {
                found: header.header_size,
                expected: HEADER_SIZE as u32,
            });
        }

        if header.ops_offset < HEADER_SIZE as u64 || header.ops_offset >= file_size {
            return Err(CowError::range(format!(
                "ops offset {} outside file of {} bytes",
                header.ops_offset, file_size
            )));
        }
        if file_size - header.ops_offset < header.ops_size {
            return Err(CowError::range(format!(
                "ops size {} too large for file of {} bytes",
                header.ops_size, file_size
            )));
        }
        if header.ops_size % OP_SIZE as u64 != 0 {
            return Err(CowError::range(format!(
                "ops size {} is not a multiple of the record size",
                header.ops_size
            )));
        }

        if header.compute_checksum() != header.header_checksum {
            return Err(CowError::ChecksumMismatch { region: "header" });
        }

        Ok(Self {
            source,
            header,
            file_size,
        })
    }

    /// Returns a copy of the validated header.
    #[must_use]
    pub fn header(&self) -> CowHeader {
        self.header
    }

    /// Reads and verifies the operation table, returning a fresh iterator.
    ///
    /// The iterator owns the table bytes; the reader may be dropped while
    /// iteration continues.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::Storage`] if the table cannot be read, or
    /// [`CowError::ChecksumMismatch`] if its digest disagrees with the
    /// header.
    pub fn op_iter(&self) -> CowResult<CowOpIter> {
        let mut ops = vec![0u8; self.header.ops_size as usize];
        self.source.read_exact_at(self.header.ops_offset, &mut ops)?;

        if sha256(&ops) != self.header.ops_checksum {
            return Err(CowError::ChecksumMismatch { region: "op table" });
        }

        Ok(CowOpIter::new(ops))
    }

    /// Reads raw bytes from the payload region.
    ///
    /// The range is validated before any I/O: `offset` must lie in
    /// `[HEADER_SIZE, ops_offset)` and the read must end at or before the
    /// op table. The arithmetic is overflow-safe; a hostile
    /// `offset`/`len` combination cannot wrap past the bounds.
    ///
    /// Returns the number of bytes read (short reads are legal).
    ///
    /// # Errors
    ///
    /// Returns [`CowError::Range`] on a bounds violation, without touching
    /// the source, or [`CowError::Storage`] if the read fails.
    pub fn read_raw(&self, offset: u64, buf: &mut [u8]) -> CowResult<usize> {
        let len = buf.len() as u64;
        if offset < HEADER_SIZE as u64
            || offset >= self.header.ops_offset
            || len >= self.file_size
            || len > self.header.ops_offset - offset
        {
            return Err(CowError::range(format!(
                "invalid data offset: {offset}, {len} bytes"
            )));
        }

        Ok(self.source.read_at(offset, buf)?)
    }

    /// Streams one operation's payload through its codec into `sink`.
    ///
    /// The payload at `(op.source, op.data_length)` is decompressed to
    /// exactly one `block_size` of output.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::Decompress`] if the codec refuses the stream
    /// or the decoded length is not `block_size`, or any
    /// [`CowError::Range`]/[`CowError::Storage`] propagated from payload
    /// reads.
    pub fn read_data(&self, op: &CowOperation, sink: &mut dyn ByteSink) -> CowResult<()> {
        let mut stream = CowDataStream::new(self, op.source, op.data_length);
        decompress::decompress(op.compression, &mut stream, sink, self.header.block_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Compression, OpType};
    use snapcow_storage::InMemorySource;
    use std::io::Write;

    /// Assembles a container: header, payload region, op table, both
    /// digests filled. The container producer itself lives outside this
    /// crate, so fixtures are built from the shared format directly.
    fn build_container(block_size: u32, payload: &[u8], ops: &[CowOperation]) -> Vec<u8> {
        let op_table: Vec<u8> = ops.iter().flat_map(CowOperation::encode).collect();
        let mut header = CowHeader {
            magic: COW_MAGIC,
            major_version: COW_VERSION_MAJOR,
            minor_version: COW_VERSION_MINOR,
            header_size: HEADER_SIZE as u32,
            block_size,
            ops_offset: (HEADER_SIZE + payload.len()) as u64,
            ops_size: op_table.len() as u64,
            header_checksum: [0u8; 32],
            ops_checksum: sha256(&op_table),
        };
        header.header_checksum = header.compute_checksum();

        let mut bytes = header.encode();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&op_table);
        if op_table.is_empty() {
            // parse requires ops_offset to lie strictly inside the file.
            bytes.push(0);
        }
        bytes
    }

    fn zero_op(new_block: u64) -> CowOperation {
        CowOperation {
            op_type: OpType::Zero,
            compression: Compression::None,
            data_length: 0,
            new_block,
            source: 0,
        }
    }

    fn label_op(label: u64) -> CowOperation {
        CowOperation {
            op_type: OpType::Label,
            compression: Compression::None,
            data_length: 0,
            new_block: 0,
            source: label,
        }
    }

    /// A replace op whose payload starts right after the header.
    fn replace_op(new_block: u64, compression: Compression, data_length: u64) -> CowOperation {
        CowOperation {
            op_type: OpType::Replace,
            compression,
            data_length,
            new_block,
            source: HEADER_SIZE as u64,
        }
    }

    fn gz_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn brotli_compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            encoder.write_all(data).unwrap();
        }
        out
    }

    fn parse_bytes(bytes: Vec<u8>) -> CowResult<CowReader> {
        CowReader::parse(Box::new(InMemorySource::with_data(bytes)))
    }

    fn minimal_file() -> Vec<u8> {
        build_container(4096, &[], &[])
    }

    #[test]
    fn parse_minimal_file() {
        let reader = parse_bytes(minimal_file()).unwrap();
        let header = reader.header();
        assert_eq!(header.magic, COW_MAGIC);
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.ops_offset, HEADER_SIZE as u64);
        assert_eq!(header.ops_size, 0);
        assert!(reader.op_iter().unwrap().done());
    }

    #[test]
    fn parse_empty_source_fails_with_storage_error() {
        let result = parse_bytes(Vec::new());
        assert!(matches!(result, Err(CowError::Storage(_))));
    }

    #[test]
    fn parse_truncated_header_fails_with_storage_error() {
        let mut bytes = minimal_file();
        bytes.truncate(HEADER_SIZE - 10);
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::Storage(_))));
    }

    #[test]
    fn parse_bad_magic() {
        let mut bytes = minimal_file();
        bytes[0] ^= 0xFF;
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::BadMagic { .. })));
    }

    #[test]
    fn parse_unsupported_version() {
        let mut bytes = minimal_file();
        bytes[4] = 9; // major version
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::UnsupportedVersion { .. })));
    }

    #[test]
    fn parse_header_size_mismatch() {
        let mut bytes = minimal_file();
        bytes[8] = 95; // declared header size
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::HeaderSizeMismatch { .. })));
    }

    #[test]
    fn parse_header_checksum_flip_one_bit() {
        let mut bytes = minimal_file();
        bytes[32] ^= 0x01; // first header_checksum byte
        let result = parse_bytes(bytes);
        assert!(matches!(
            result,
            Err(CowError::ChecksumMismatch { region: "header" })
        ));
    }

    #[test]
    fn parse_file_of_exactly_header_size_fails_range() {
        // ops_offset == file_size can never hold a table.
        let mut bytes = minimal_file();
        bytes.truncate(HEADER_SIZE);
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::Range { .. })));
    }

    #[test]
    fn parse_truncated_op_table_fails_range() {
        let mut bytes = build_container(4096, &[], &[zero_op(1), zero_op(2)]);
        bytes.truncate(bytes.len() - 1); // file_size = ops_offset + ops_size - 1
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::Range { .. })));
    }

    #[test]
    fn parse_ragged_ops_size_fails_range() {
        let mut bytes = build_container(4096, &[], &[zero_op(1)]);
        // Declare an ops_size that is not a whole number of records,
        // padded so the in-file-range checks still pass.
        let ops_size = (OP_SIZE as u64) + 1;
        bytes[24..32].copy_from_slice(&ops_size.to_le_bytes());
        bytes.push(0);
        let result = parse_bytes(bytes);
        assert!(matches!(result, Err(CowError::Range { .. })));
    }

    #[test]
    fn op_table_checksum_flip_one_bit() {
        let mut bytes = build_container(4096, &[], &[zero_op(7)]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80; // inside the op table

        // Parse succeeds (header digest does not cover table bytes)...
        let reader = parse_bytes(bytes).unwrap();
        // ...but the op table digest catches the corruption.
        let result = reader.op_iter();
        assert!(matches!(
            result,
            Err(CowError::ChecksumMismatch { region: "op table" })
        ));
    }

    #[test]
    fn op_iter_counts_records() {
        let ops: Vec<_> = (0..5u64).map(zero_op).collect();
        let reader = parse_bytes(build_container(4096, &[], &ops)).unwrap();
        assert_eq!(reader.header().ops_size, 5 * OP_SIZE as u64);
        assert_eq!(reader.op_iter().unwrap().count(), 5);
    }

    #[test]
    fn op_iter_outlives_reader() {
        let reader = parse_bytes(build_container(4096, &[], &[label_op(42)])).unwrap();
        let iter = reader.op_iter().unwrap();
        drop(reader);

        let ops: Vec<_> = iter.map(|op| op.unwrap()).collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op_type, OpType::Label);
        assert_eq!(ops[0].source, 42);
    }

    #[test]
    fn read_raw_round_trips_payload() {
        let block = vec![0xAB; 4096];
        let ops = [replace_op(5, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();

        let mut buf = vec![0u8; 4096];
        let n = reader.read_raw(HEADER_SIZE as u64, &mut buf).unwrap();
        assert_eq!(n, 4096);
        assert_eq!(buf, block);
    }

    #[test]
    fn read_raw_rejects_out_of_range() {
        let block = vec![0u8; 4096];
        let ops = [replace_op(0, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();
        let ops_offset = reader.header().ops_offset;

        let mut buf = [0u8; 16];
        // Inside the header.
        assert!(matches!(
            reader.read_raw(0, &mut buf),
            Err(CowError::Range { .. })
        ));
        assert!(matches!(
            reader.read_raw(HEADER_SIZE as u64 - 1, &mut buf),
            Err(CowError::Range { .. })
        ));
        // At or past the op table.
        assert!(matches!(
            reader.read_raw(ops_offset, &mut buf),
            Err(CowError::Range { .. })
        ));
        // Crossing into the op table.
        let mut big = vec![0u8; 4096];
        assert!(matches!(
            reader.read_raw(HEADER_SIZE as u64 + 1, &mut big),
            Err(CowError::Range { .. })
        ));
    }

    #[test]
    fn read_raw_rejects_overflowing_range() {
        let block = vec![0u8; 4096];
        let ops = [replace_op(0, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();

        // offset + len would wrap in u64; the overflow-safe checks must
        // still reject the read.
        let mut buf = vec![0u8; 8192];
        let result = reader.read_raw(u64::MAX - 4, &mut buf);
        assert!(matches!(result, Err(CowError::Range { .. })));
    }

    #[test]
    fn read_data_uncompressed_matches_read_raw() {
        let block: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let ops = [replace_op(3, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();

        let op = reader.op_iter().unwrap().next().unwrap().unwrap();
        assert_eq!(op.op_type, OpType::Replace);
        assert_eq!(op.compression, Compression::None);
        assert_eq!(op.data_length, 4096);

        let mut sink = Vec::new();
        reader.read_data(&op, &mut sink).unwrap();

        let mut raw = vec![0u8; 4096];
        reader.read_raw(op.source, &mut raw).unwrap();
        assert_eq!(sink, raw);
        assert_eq!(sink, block);
    }

    #[test]
    fn read_data_single_replace_of_constant_block() {
        let block = vec![0xAB; 4096];
        let ops = [replace_op(0, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();

        let op = reader.op_iter().unwrap().next().unwrap().unwrap();
        assert_eq!(op.source, HEADER_SIZE as u64);

        let mut sink = Vec::new();
        reader.read_data(&op, &mut sink).unwrap();
        assert_eq!(sink, block);
    }

    #[test]
    fn read_data_gz_round_trip() {
        let block: Vec<u8> = (0..4096u32).map(|i| (i / 16) as u8).collect();
        let payload = gz_compress(&block);
        let ops = [replace_op(1, Compression::Gz, payload.len() as u64)];
        let reader = parse_bytes(build_container(4096, &payload, &ops)).unwrap();

        let op = reader.op_iter().unwrap().next().unwrap().unwrap();
        assert_eq!(op.compression, Compression::Gz);
        assert!(op.data_length < 4096);

        let mut sink = Vec::new();
        reader.read_data(&op, &mut sink).unwrap();
        assert_eq!(sink, block);
    }

    #[test]
    fn read_data_brotli_round_trip() {
        let block: Vec<u8> = std::iter::repeat(b"snapcow".as_slice())
            .flatten()
            .copied()
            .take(4096)
            .collect();
        let payload = brotli_compress(&block);
        let ops = [replace_op(1, Compression::Brotli, payload.len() as u64)];
        let reader = parse_bytes(build_container(4096, &payload, &ops)).unwrap();

        let op = reader.op_iter().unwrap().next().unwrap().unwrap();
        assert_eq!(op.compression, Compression::Brotli);

        let mut sink = Vec::new();
        reader.read_data(&op, &mut sink).unwrap();
        assert_eq!(sink, block);
    }

    #[test]
    fn read_data_hostile_payload_range_is_range_error() {
        let block = vec![0u8; 4096];
        let ops = [replace_op(0, Compression::None, 4096)];
        let reader = parse_bytes(build_container(4096, &block, &ops)).unwrap();

        let mut op = reader.op_iter().unwrap().next().unwrap().unwrap();
        op.source = 0; // point the payload into the header

        let mut sink = Vec::new();
        let result = reader.read_data(&op, &mut sink);
        assert!(matches!(result, Err(CowError::Range { .. })));
    }

    #[test]
    fn read_data_corrupt_gz_stream_is_decompress_error() {
        let block = vec![0x5A; 4096];
        let payload = gz_compress(&block);
        let ops = [replace_op(0, Compression::Gz, payload.len() as u64)];
        let mut bytes = build_container(4096, &payload, &ops);

        // Payload bytes are covered by neither digest, so parse and
        // op_iter still pass; the codec sees a mangled gzip magic.
        bytes[HEADER_SIZE] ^= 0xFF;
        let reader = parse_bytes(bytes).unwrap();

        let op = reader.op_iter().unwrap().next().unwrap().unwrap();
        let mut sink = Vec::new();
        let result = reader.read_data(&op, &mut sink);
        assert!(matches!(result, Err(CowError::Decompress { .. })));
    }
}
