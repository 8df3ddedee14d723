//! On-disk COW container format.
//!
//! All multi-byte fields are little-endian. The layout is shared with the
//! external container producer and must never change without a version
//! bump:
//!
//! ```text
//! Header (96 bytes):
//! | magic (4) | major (2) | minor (2) | header_size (4) | block_size (4) |
//! | ops_offset (8) | ops_size (8) | header_checksum (32) | ops_checksum (32) |
//!
//! Operation (28 bytes):
//! | type (1) | compression (1) | pad (2) | data_length (8) |
//! | new_block (8) | source (8) |
//! ```

use crate::error::{CowError, CowResult};
use sha2::{Digest, Sha256};

/// Magic number identifying a COW container.
pub const COW_MAGIC: u32 = 0x5566_7788;

/// Supported major format version.
pub const COW_VERSION_MAJOR: u16 = 1;

/// Supported minor format version.
pub const COW_VERSION_MINOR: u16 = 0;

/// Size of the on-disk header in bytes.
pub const HEADER_SIZE: usize = 96;

/// Size of one on-disk operation record in bytes.
pub const OP_SIZE: usize = 28;

/// Byte range of the `header_checksum` field within the encoded header.
const HEADER_CHECKSUM_RANGE: std::ops::Range<usize> = 32..64;

/// Type of a COW operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpType {
    /// Copy a block from the base image.
    Copy = 1,
    /// Replace a block with a literal (possibly compressed) payload.
    Replace = 2,
    /// Zero-fill a block.
    Zero = 3,
    /// Merge checkpoint marker.
    Label = 4,
}

impl OpType {
    /// Converts a byte to an operation type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Copy),
            2 => Some(Self::Replace),
            3 => Some(Self::Zero),
            4 => Some(Self::Label),
            _ => None,
        }
    }

    /// Converts the operation type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Compression applied to an operation's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    /// Identity (no compression).
    None = 0,
    /// Deflate with a gzip wrapper.
    Gz = 1,
    /// Brotli.
    Brotli = 2,
}

impl Compression {
    /// Converts a byte to a compression kind.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::None),
            1 => Some(Self::Gz),
            2 => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Converts the compression kind to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// The fixed-size container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CowHeader {
    /// Container magic; must equal [`COW_MAGIC`].
    pub magic: u32,
    /// Major format version.
    pub major_version: u16,
    /// Minor format version.
    pub minor_version: u16,
    /// Declared header size; must equal [`HEADER_SIZE`].
    pub header_size: u32,
    /// Uncompressed size each payload expands to.
    pub block_size: u32,
    /// Byte offset of the operation table.
    pub ops_offset: u64,
    /// Byte length of the operation table.
    pub ops_size: u64,
    /// SHA-256 over the header with this field zeroed.
    pub header_checksum: [u8; 32],
    /// SHA-256 over the operation table bytes.
    pub ops_checksum: [u8; 32],
}

impl CowHeader {
    /// Encodes the header to its on-disk form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.extend_from_slice(&self.major_version.to_le_bytes());
        buf.extend_from_slice(&self.minor_version.to_le_bytes());
        buf.extend_from_slice(&self.header_size.to_le_bytes());
        buf.extend_from_slice(&self.block_size.to_le_bytes());
        buf.extend_from_slice(&self.ops_offset.to_le_bytes());
        buf.extend_from_slice(&self.ops_size.to_le_bytes());
        buf.extend_from_slice(&self.header_checksum);
        buf.extend_from_slice(&self.ops_checksum);
        debug_assert_eq!(buf.len(), HEADER_SIZE);
        buf
    }

    /// Decodes a header from its on-disk form.
    ///
    /// Only the layout is interpreted here; field validation belongs to
    /// [`crate::CowReader::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`CowError::Range`] if `data` is shorter than [`HEADER_SIZE`].
    pub fn decode(data: &[u8]) -> CowResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CowError::range(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let mut header_checksum = [0u8; 32];
        header_checksum.copy_from_slice(&data[32..64]);
        let mut ops_checksum = [0u8; 32];
        ops_checksum.copy_from_slice(&data[64..96]);

        Ok(Self {
            magic: le_u32(&data[0..4]),
            major_version: le_u16(&data[4..6]),
            minor_version: le_u16(&data[6..8]),
            header_size: le_u32(&data[8..12]),
            block_size: le_u32(&data[12..16]),
            ops_offset: le_u64(&data[16..24]),
            ops_size: le_u64(&data[24..32]),
            header_checksum,
            ops_checksum,
        })
    }

    /// Computes the SHA-256 digest the `header_checksum` field must carry:
    /// the digest of the encoded header with that field zeroed.
    #[must_use]
    pub fn compute_checksum(&self) -> [u8; 32] {
        let mut encoded = self.encode();
        encoded[HEADER_CHECKSUM_RANGE].fill(0);
        sha256(&encoded)
    }
}

/// One decoded operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CowOperation {
    /// What this operation does to its destination block.
    pub op_type: OpType,
    /// Compression applied to the payload, if any.
    pub compression: Compression,
    /// Compressed payload length in the container.
    pub data_length: u64,
    /// Destination block index in the target image.
    pub new_block: u64,
    /// Payload byte offset, source block index (COPY), or label value
    /// (LABEL), depending on `op_type`.
    pub source: u64,
}

impl CowOperation {
    /// Encodes the operation to its on-disk form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OP_SIZE);
        buf.push(self.op_type.as_byte());
        buf.push(self.compression.as_byte());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&self.data_length.to_le_bytes());
        buf.extend_from_slice(&self.new_block.to_le_bytes());
        buf.extend_from_slice(&self.source.to_le_bytes());
        debug_assert_eq!(buf.len(), OP_SIZE);
        buf
    }

    /// Decodes an operation from its on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`CowError::UnknownOpType`] or [`CowError::UnknownCompression`]
    /// for unrecognized enum bytes, or [`CowError::Range`] if `data` is
    /// shorter than [`OP_SIZE`].
    pub fn decode(data: &[u8]) -> CowResult<Self> {
        if data.len() < OP_SIZE {
            return Err(CowError::range(format!(
                "operation record needs {OP_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let op_type = OpType::from_byte(data[0]).ok_or(CowError::UnknownOpType { value: data[0] })?;
        let compression = Compression::from_byte(data[1])
            .ok_or(CowError::UnknownCompression { value: data[1] })?;

        Ok(Self {
            op_type,
            compression,
            data_length: le_u64(&data[4..12]),
            new_block: le_u64(&data[12..20]),
            source: le_u64(&data[20..28]),
        })
    }
}

fn le_u16(data: &[u8]) -> u16 {
    u16::from_le_bytes([data[0], data[1]])
}

fn le_u32(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

fn le_u64(data: &[u8]) -> u64 {
    u64::from_le_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ])
}

/// Computes the SHA-256 digest of `data`.
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
