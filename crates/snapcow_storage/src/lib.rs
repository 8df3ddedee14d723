//! # Snapcow Storage
//!
//! Byte source abstraction for the snapcow COW container reader.
//!
//! This crate provides:
//! - [`ByteSource`] - random-access positioned reads over an opaque handle
//! - [`FileSource`] - read-only file-backed source
//! - [`InMemorySource`] - in-memory source for testing

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod source;

pub use error::{StorageError, StorageResult};
pub use file::FileSource;
pub use memory::InMemorySource;
pub use source::ByteSource;
