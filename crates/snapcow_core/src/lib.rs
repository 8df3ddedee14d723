//! # Snapcow Core
//!
//! Reader for the snapcow copy-on-write snapshot container.
//!
//! A container records block-level deltas against a base device image:
//!
//! ```text
//! | header (96 bytes) | payload region | op table (ops_size bytes) |
//! ```
//!
//! The header self-describes the file (magic, version, block size, op
//! table location) and carries SHA-256 digests over itself and the op
//! table. Every offset and length in the file is untrusted: the reader
//! validates structure before any payload read.
//!
//! ## Reading
//!
//! ```ignore
//! let source = FileSource::open(Path::new("update.cow"))?;
//! let reader = CowReader::parse(Box::new(source))?;
//! let mut iter = reader.op_iter()?;
//! for op in &mut iter {
//!     let op = op?;
//!     if op.op_type == OpType::Replace {
//!         let mut block = Vec::new();
//!         reader.read_data(&op, &mut block)?;
//!     }
//! }
//! ```
//!
//! ## Validation policy
//!
//! Structural faults are fatal, never repaired:
//!
//! - Bad magic, version or header-size mismatch → typed error
//! - Offsets or lengths outside the file → [`CowError::Range`]
//! - Header or op-table digest mismatch → [`CowError::ChecksumMismatch`]
//! - Unknown op type or compression id → typed error at decode

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decompress;
mod error;
mod format;
mod iter;
mod reader;
mod stream;

pub use error::{CowError, CowResult};
pub use format::{
    Compression, CowHeader, CowOperation, OpType, COW_MAGIC, COW_VERSION_MAJOR, COW_VERSION_MINOR,
    HEADER_SIZE, OP_SIZE,
};
pub use iter::CowOpIter;
pub use reader::CowReader;
pub use stream::{ByteSink, ByteStream, CowDataStream};
