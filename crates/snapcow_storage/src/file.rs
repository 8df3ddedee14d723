//! File-backed byte source for on-disk containers.

use crate::error::StorageResult;
use crate::source::ByteSource;
use parking_lot::RwLock;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A read-only file-backed byte source.
///
/// The file size is captured at open time; a container is never appended
/// to while being read, so the cached size stays authoritative for the
/// lifetime of the source.
///
/// # Thread Safety
///
/// The file handle is behind an internal lock so the source can be shared
/// across threads, although the COW reader itself is single-caller by
/// contract.
///
/// # Example
///
/// ```no_run
/// use snapcow_storage::{ByteSource, FileSource};
/// use std::path::Path;
///
/// let source = FileSource::open(Path::new("update.cow")).unwrap();
/// let mut buf = [0u8; 16];
/// let n = source.read_at(0, &mut buf).unwrap();
/// assert!(n <= 16);
/// ```
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: RwLock<File>,
    size: u64,
}

impl FileSource {
    /// Opens an existing file as a byte source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its metadata
    /// cannot be read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }

        let available = (self.size - offset) as usize;
        let want = buf.len().min(available);

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        let n = file.read(&mut buf[..want])?;

        Ok(n)
    }
}
