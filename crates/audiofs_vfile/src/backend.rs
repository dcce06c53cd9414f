//! Backend trait shared by memory- and disk-backed files.

use crate::error::{VfsError, VfsResult};
use crate::types::Whence;

/// Largest request a single read or write may carry.
///
/// The consuming media library passes lengths as a signed 32-bit `int`.
pub const MAX_IO_LEN: usize = i32::MAX as usize;

/// Cursor-based byte storage behind a [`crate::VirtualFile`].
///
/// Backends behave like an open file descriptor: one cursor, reads and
/// writes advance it, seeks move it.
///
/// # Invariants
///
/// - `read` returns `0` at or past the logical end, never an error
/// - `write` either writes every byte or changes nothing
/// - `size` is the logical length, not the allocated capacity
///
/// # Implementors
///
/// - [`crate::MemoryFile`] - growable in-process buffer
/// - [`crate::DiskFile`] - OS file with synchronous writes
pub trait VfsBackend: Send + Sync {
    /// Reads up to `buf.len()` bytes at the cursor and advances it.
    ///
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` exceeds [`MAX_IO_LEN`] or the read fails.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Writes `data` at the cursor and advances it.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` exceeds [`MAX_IO_LEN`], storage cannot
    /// grow, or the write fails.
    fn write(&mut self, data: &[u8]) -> VfsResult<usize>;

    /// Moves the cursor and returns the new absolute position.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is negative or cannot be reached.
    fn seek(&mut self, offset: i64, whence: Whence) -> VfsResult<u64>;

    /// Returns the logical length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be determined.
    fn size(&self) -> VfsResult<u64>;

    /// Returns true if the bytes live only in process memory.
    fn is_memory_backed(&self) -> bool;

    /// Commits data and metadata to durable storage where that applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> VfsResult<()>;
}

/// Rejects lengths that do not fit the 32-bit signed I/O surface.
pub(crate) fn check_io_len(len: usize) -> VfsResult<()> {
    if len > MAX_IO_LEN {
        return Err(VfsError::Overflow {
            requested: len as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_len_limits() {
        assert!(check_io_len(0).is_ok());
        assert!(check_io_len(MAX_IO_LEN).is_ok());
        assert!(matches!(
            check_io_len(MAX_IO_LEN + 1),
            Err(VfsError::Overflow { .. })
        ));
    }
}
