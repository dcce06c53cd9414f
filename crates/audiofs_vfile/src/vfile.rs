//! The virtual file handle handed to media I/O callbacks.

use crate::backend::VfsBackend;
use crate::buffer::BufferView;
use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::file::DiskFile;
use crate::memory::MemoryFile;
use crate::types::{VfsTarget, Whence};
use std::io;
use std::path::Path;
use tracing::{debug, error, info_span, warn, Span};
use uuid::Uuid;

/// Storage chosen when the file was opened.
#[derive(Debug)]
enum Backend {
    Memory(MemoryFile),
    Disk(DiskFile),
}

/// A file-like handle over either a memory buffer or a disk file.
///
/// Every operation runs inside the handle's own `vfile` tracing span, which
/// is a child of whatever span was current when the file was opened.
///
/// # Example
///
/// ```rust
/// use audiofs_vfile::{VfsConfig, VfsTarget, VirtualFile, Whence};
///
/// let mut file = VirtualFile::open(VfsTarget::Memory, &VfsConfig::default()).unwrap();
/// file.write(b"OggS").unwrap();
/// assert_eq!(file.size().unwrap(), 4);
///
/// file.seek(0, Whence::Start).unwrap();
/// let mut magic = [0u8; 4];
/// file.read(&mut magic).unwrap();
/// assert_eq!(&magic, b"OggS");
/// file.close().unwrap();
/// ```
#[derive(Debug)]
pub struct VirtualFile {
    id: Uuid,
    backend: Backend,
    span: Span,
}

impl VirtualFile {
    /// Opens a virtual file on `target`.
    ///
    /// Memory targets start empty with `config.initial_capacity` bytes
    /// reserved. Path targets are created or truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated or the file cannot
    /// be opened. Nothing is left behind on failure.
    pub fn open(target: VfsTarget, config: &VfsConfig) -> VfsResult<Self> {
        let id = Uuid::new_v4();
        let span = info_span!(
            "vfile",
            %id,
            backend = if target.is_memory() { "memory" } else { "disk" }
        );
        let backend = {
            let _enter = span.enter();
            match target {
                VfsTarget::Memory => {
                    debug!(capacity = config.initial_capacity, "using memory buffer");
                    Backend::Memory(MemoryFile::new(config.initial_capacity)?)
                }
                VfsTarget::Path(path) => Backend::Disk(DiskFile::create(&path, config)?),
            }
        };

        Ok(Self { id, backend, span })
    }

    /// Opens a memory-backed file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    pub fn open_memory() -> VfsResult<Self> {
        Self::open(VfsTarget::Memory, &VfsConfig::default())
    }

    /// Returns the identifier used in this handle's log span.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Reads up to `buf.len()` bytes at the cursor.
    ///
    /// Returns `0` at the end of the file.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if `buf` is longer than `i32::MAX`, or
    /// the backend's failure.
    pub fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let (span, backend) = self.parts_mut();
        let _enter = span.enter();
        let result = backend.read(buf);
        log_failure("read", &result);
        result
    }

    /// Writes `data` at the cursor, extending the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if `data` is longer than `i32::MAX`,
    /// an allocation error if a memory file cannot grow, or the backend's
    /// failure.
    pub fn write(&mut self, data: &[u8]) -> VfsResult<usize> {
        let (span, backend) = self.parts_mut();
        let _enter = span.enter();
        let result = backend.write(data);
        log_failure("write", &result);
        result
    }

    /// Moves the cursor and returns the new absolute position.
    ///
    /// On a memory file a seek past the end reserves storage but does not
    /// change [`VirtualFile::size`].
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidSeek`] for a negative target, or the
    /// backend's failure.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> VfsResult<u64> {
        let (span, backend) = self.parts_mut();
        let _enter = span.enter();
        let result = backend.seek(offset, whence);
        log_failure("seek", &result);
        result
    }

    /// Returns the logical length of the file.
    ///
    /// # Errors
    ///
    /// A disk file that is empty or cannot be inspected is an error.
    pub fn size(&self) -> VfsResult<u64> {
        let _enter = self.span.enter();
        let result = self.backend().size();
        log_failure("size", &result);
        result
    }

    /// Returns true if the file lives in process memory.
    #[must_use]
    pub fn is_memory_backed(&self) -> bool {
        self.backend().is_memory_backed()
    }

    /// Forces data and metadata to durable storage. A no-op for memory files.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> VfsResult<()> {
        let (span, backend) = self.parts_mut();
        let _enter = span.enter();
        backend.sync()
    }

    /// Returns the allocated capacity of a memory file.
    #[must_use]
    pub fn capacity(&self) -> Option<u64> {
        self.as_memory().map(MemoryFile::capacity)
    }

    /// Returns the path of a disk file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Memory(_) => None,
            Backend::Disk(disk) => Some(disk.path()),
        }
    }

    /// Returns the memory backend, if this is a memory file.
    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryFile> {
        match &self.backend {
            Backend::Memory(memory) => Some(memory),
            Backend::Disk(_) => None,
        }
    }

    /// Returns the memory backend mutably, if this is a memory file.
    pub fn as_memory_mut(&mut self) -> Option<&mut MemoryFile> {
        match &mut self.backend {
            Backend::Memory(memory) => Some(memory),
            Backend::Disk(_) => None,
        }
    }

    /// Borrows the logical content of a memory file.
    ///
    /// Returns `None` for disk files. The buffer cannot be resized while the
    /// view is alive.
    pub fn contents(&self) -> Option<VfsResult<BufferView<'_>>> {
        self.as_memory().map(MemoryFile::contents)
    }

    /// Consumes the handle and returns the complete file content.
    ///
    /// A disk file is read back from its path after closing.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read.
    pub fn into_bytes(self) -> VfsResult<Vec<u8>> {
        let span = self.span.clone();
        let _enter = span.enter();
        match self.backend {
            Backend::Memory(memory) => memory.into_bytes(),
            Backend::Disk(disk) => {
                let path = disk.path().to_path_buf();
                disk.close()?;
                Ok(std::fs::read(path)?)
            }
        }
    }

    /// Returns true while a pointer into a memory file is lent out.
    #[must_use]
    pub fn is_lent(&self) -> bool {
        self.as_memory().is_some_and(|memory| memory.buffer().is_lent())
    }

    /// Closes the handle.
    ///
    /// Memory content is discarded. Disk content is already durable.
    ///
    /// A memory file with an outstanding loan is not freed: its storage is
    /// leaked so the lent pointer stays valid, and [`VfsError::BufferLent`]
    /// is returned. Reclaim every loan before closing to avoid this.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::BufferLent`] if a loan is outstanding, or an error
    /// if the disk lock cannot be released.
    pub fn close(self) -> VfsResult<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        match self.backend {
            Backend::Memory(memory) if memory.buffer().is_lent() => {
                error!(
                    capacity = memory.capacity(),
                    "closing a lent buffer, leaking it to keep the loan valid"
                );
                std::mem::forget(memory);
                Err(VfsError::BufferLent)
            }
            Backend::Memory(memory) => {
                debug!(
                    size = memory.size().unwrap_or_default(),
                    capacity = memory.capacity(),
                    "releasing memory buffer"
                );
                drop(memory);
                Ok(())
            }
            Backend::Disk(disk) => disk.close(),
        }
    }

    fn backend(&self) -> &dyn VfsBackend {
        match &self.backend {
            Backend::Memory(memory) => memory,
            Backend::Disk(disk) => disk,
        }
    }

    /// Splits the handle into its span and backend so both can be held at once.
    fn parts_mut(&mut self) -> (&Span, &mut dyn VfsBackend) {
        let backend: &mut dyn VfsBackend = match &mut self.backend {
            Backend::Memory(memory) => memory,
            Backend::Disk(disk) => disk,
        };
        (&self.span, backend)
    }
}

fn log_failure<T>(op: &'static str, result: &VfsResult<T>) {
    if let Err(err) = result {
        if err.is_fatal() {
            return; // already reported by the buffer
        }
        warn!(op, error = %err, "virtual file operation failed");
    }
}

impl io::Read for VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(crate::backend::MAX_IO_LEN);
        Ok(VirtualFile::read(self, &mut buf[..len])?)
    }
}

impl io::Write for VirtualFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(crate::backend::MAX_IO_LEN);
        Ok(VirtualFile::write(self, &buf[..len])?)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Disk writes are synchronous; nothing is buffered here.
        Ok(())
    }
}

impl io::Seek for VirtualFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(start) => {
                let offset = i64::try_from(start).map_err(|_| {
                    io::Error::from(VfsError::Overflow { requested: start })
                })?;
                (offset, Whence::Start)
            }
            io::SeekFrom::Current(offset) => (offset, Whence::Current),
            io::SeekFrom::End(offset) => (offset, Whence::End),
        };
        Ok(VirtualFile::seek(self, offset, whence)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};
    use tempfile::tempdir;

    #[test]
    fn vfile_memory_open() {
        let file = VirtualFile::open_memory().unwrap();
        assert!(file.is_memory_backed());
        assert_eq!(file.size().unwrap(), 0);
        assert_eq!(file.capacity(), Some(1024));
        assert!(file.path().is_none());
    }

    #[test]
    fn vfile_disk_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.wav");

        let file = VirtualFile::open(VfsTarget::path(&path), &VfsConfig::default()).unwrap();
        assert!(!file.is_memory_backed());
        assert_eq!(file.path(), Some(path.as_path()));
        assert!(file.capacity().is_none());
        assert!(file.as_memory().is_none());
        file.close().unwrap();
    }

    #[test]
    fn vfile_open_failure_returns_error() {
        let dir = tempdir().unwrap();
        let target = VfsTarget::path(dir.path().join("no").join("such").join("dir.wav"));
        assert!(VirtualFile::open(target, &VfsConfig::default()).is_err());
    }

    #[test]
    fn vfile_ids_are_distinct() {
        let a = VirtualFile::open_memory().unwrap();
        let b = VirtualFile::open_memory().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn vfile_seek_past_end_then_write() {
        let mut file = VirtualFile::open_memory().unwrap();
        assert_eq!(file.seek(100, Whence::Start).unwrap(), 100);
        assert_eq!(file.size().unwrap(), 0);

        file.write(&[1]).unwrap();
        assert_eq!(file.size().unwrap(), 101);

        let bytes = file.into_bytes().unwrap();
        assert!(bytes[..100].iter().all(|b| *b == 0));
        assert_eq!(bytes[100], 1);
    }

    #[test]
    fn vfile_invalid_seek_from_end() {
        let mut file = VirtualFile::open_memory().unwrap();
        assert!(matches!(
            file.seek(-1, Whence::End),
            Err(VfsError::InvalidSeek { .. })
        ));
    }

    #[test]
    fn vfile_std_io_traits() {
        let mut file = VirtualFile::open_memory().unwrap();
        file.write_all(b"fLaC\0\0\0\x22").unwrap();
        file.flush().unwrap();

        assert_eq!(Seek::seek(&mut file, SeekFrom::Start(0)).unwrap(), 0);
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, b"fLaC");

        assert_eq!(Seek::seek(&mut file, SeekFrom::End(-1)).unwrap(), 7);
        let mut rest = Vec::new();
        file.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![0x22]);
    }

    #[test]
    fn vfile_std_seek_rejects_huge_start() {
        let mut file = VirtualFile::open_memory().unwrap();
        let err = Seek::seek(&mut file, SeekFrom::Start(u64::MAX)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn vfile_disk_into_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut file = VirtualFile::open(VfsTarget::path(&path), &VfsConfig::default()).unwrap();
        file.write(b"persisted").unwrap();

        assert_eq!(file.into_bytes().unwrap(), b"persisted");
        assert!(path.exists());
    }

    #[test]
    fn vfile_memory_contents_view() {
        let mut file = VirtualFile::open_memory().unwrap();
        file.write(b"abc").unwrap();
        assert_eq!(&*file.contents().unwrap().unwrap(), b"abc");
        assert_eq!(file.as_memory().unwrap().position(), 3);
    }

    #[test]
    fn vfile_io_through_span() {
        let mut file = VirtualFile::open_memory().unwrap();
        assert_eq!(file.write(b"abcdef").unwrap(), 6);
        assert_eq!(file.seek(2, Whence::Start).unwrap(), 2);
        let mut out = [0u8; 2];
        assert_eq!(file.read(&mut out).unwrap(), 2);
        assert_eq!(&out, b"cd");
        file.sync().unwrap();
    }

    #[test]
    fn vfile_close_with_outstanding_loan_is_refused() {
        let mut file = VirtualFile::open_memory().unwrap();
        file.write(b"lent").unwrap();
        let loan = file.as_memory().unwrap().lend().unwrap();
        assert!(file.is_lent());

        assert_eq!(loan.len, 4);
        assert!(!loan.ptr.is_null());

        assert!(matches!(file.close(), Err(VfsError::BufferLent)));
    }

    #[test]
    fn vfile_close_after_reclaim() {
        let file = VirtualFile::open_memory().unwrap();
        file.as_memory().unwrap().lend().unwrap();
        assert!(file.as_memory().unwrap().reclaim());
        assert!(!file.is_lent());
        file.close().unwrap();
    }

    #[test]
    fn vfile_disk_has_no_contents_view() {
        let dir = tempdir().unwrap();
        let file =
            VirtualFile::open(VfsTarget::path(dir.path().join("a.bin")), &VfsConfig::default())
                .unwrap();
        assert!(file.contents().is_none());
    }
}
