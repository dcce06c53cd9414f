//! Disk-backed virtual file.

use crate::backend::{check_io_len, VfsBackend};
use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::types::Whence;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// A virtual file backed by an OS file.
///
/// # Durability
///
/// With `sync_writes` enabled (the default) every `write` is followed by
/// `File::sync_data()`, so data survives `close` without a flush step.
///
/// # Example
///
/// ```no_run
/// use audiofs_vfile::{DiskFile, VfsBackend, VfsConfig};
/// use std::path::Path;
///
/// let mut file = DiskFile::create(Path::new("out.flac"), &VfsConfig::default()).unwrap();
/// file.write(b"fLaC").unwrap();
/// file.close().unwrap();
/// ```
#[derive(Debug)]
pub struct DiskFile {
    path: PathBuf,
    file: File,
    sync_writes: bool,
    locked: bool,
}

impl DiskFile {
    /// Creates or truncates the file at `path` for read-write access.
    ///
    /// The exclusive lock (if configured) is taken before truncation, so a
    /// file held by another handle is never emptied. If truncation or the
    /// initial sync fails, a file created by this call is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Locked`] if another handle holds the path, or an
    /// I/O error if the file cannot be opened or truncated.
    pub fn create(path: &Path, config: &VfsConfig) -> VfsResult<Self> {
        let (file, created) = open_read_write(path)?;

        if config.exclusive_lock && file.try_lock_exclusive().is_err() {
            return Err(VfsError::Locked(path.to_path_buf()));
        }

        discard_on_error(path, created, || {
            file.set_len(0)?;
            if config.sync_writes {
                file.sync_all()?;
            }
            Ok(())
        })?;

        info!(path = %path.display(), created, "opened disk file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_writes: config.sync_writes,
            locked: config.exclusive_lock,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock and closes the descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be released.
    pub fn close(self) -> VfsResult<()> {
        if self.locked {
            FileExt::unlock(&self.file)?;
        }
        debug!(path = %self.path.display(), "closed disk file");
        Ok(())
    }
}

impl VfsBackend for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        check_io_len(buf.len())?;
        let count = self.file.read(buf)?;
        trace!(count, "disk read");
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> VfsResult<usize> {
        check_io_len(data.len())?;
        let count = self.file.write(data)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        trace!(count, "disk write");
        Ok(count)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> VfsResult<u64> {
        let from = match whence {
            Whence::Start => match u64::try_from(offset) {
                Ok(start) => SeekFrom::Start(start),
                Err(_) => {
                    return Err(VfsError::InvalidSeek {
                        offset,
                        whence: whence.as_raw(),
                    })
                }
            },
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let position = self.file.seek(from)?;
        trace!(offset, ?whence, position, "disk seek");
        Ok(position)
    }

    fn size(&self) -> VfsResult<u64> {
        let len = self.file.metadata()?.len();
        if len == 0 {
            return Err(VfsError::EmptyFile);
        }
        Ok(len)
    }

    fn is_memory_backed(&self) -> bool {
        false
    }

    fn sync(&mut self) -> VfsResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Opens `path` read-write, creating it if needed.
///
/// Returns whether the file was created by this call.
fn open_read_write(path: &Path) -> VfsResult<(File, bool)> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    match options.clone().create_new(true).open(path) {
        Ok(file) => Ok((file, true)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok((options.open(path)?, false))
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs `setup`, removing `path` on failure if this handle created it.
fn discard_on_error(
    path: &Path,
    created: bool,
    setup: impl FnOnce() -> std::io::Result<()>,
) -> VfsResult<()> {
    let Err(e) = setup() else {
        return Ok(());
    };
    if created {
        if let Err(remove) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove, "failed to remove partial file");
        }
    }
    Err(e.into())
}
