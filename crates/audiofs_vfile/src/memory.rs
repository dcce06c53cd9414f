//! Memory-backed virtual file.

use crate::backend::{check_io_len, VfsBackend};
use crate::buffer::{BufferView, BufferViewMut, GrowableBuffer, RawLoan};
use crate::error::{VfsError, VfsResult};
use crate::types::Whence;
use tracing::trace;

/// A file that lives in a self-growing in-process buffer.
///
/// The cursor may sit beyond the logical end after a seek; the gap reads
/// back as zeros once a later write extends the file over it.
///
/// # Invariants
///
/// - `apparent_size <= buffer.capacity()`
/// - `apparent_size` never decreases
/// - bytes in `[apparent_size, capacity)` are zero
///
/// # Example
///
/// ```rust
/// use audiofs_vfile::{MemoryFile, VfsBackend, Whence};
///
/// let mut file = MemoryFile::new(1024).unwrap();
/// file.write(b"RIFF").unwrap();
/// file.seek(0, Whence::Start).unwrap();
///
/// let mut header = [0u8; 4];
/// assert_eq!(file.read(&mut header).unwrap(), 4);
/// assert_eq!(&header, b"RIFF");
/// ```
#[derive(Debug)]
pub struct MemoryFile {
    buffer: GrowableBuffer,
    position: u64,
    apparent_size: u64,
}

impl MemoryFile {
    /// Creates an empty memory file with `initial_capacity` bytes reserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    pub fn new(initial_capacity: u64) -> VfsResult<Self> {
        Ok(Self {
            buffer: GrowableBuffer::alloc(initial_capacity)?,
            position: 0,
            apparent_size: 0,
        })
    }

    /// Returns the cursor position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the allocated capacity, which may exceed the logical size.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.buffer.capacity()
    }

    /// Returns the underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &GrowableBuffer {
        &self.buffer
    }

    /// Returns a read-only view of the file content.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer fails validation.
    pub fn contents(&self) -> VfsResult<BufferView<'_>> {
        self.buffer.view(self.apparent_size)
    }

    /// Returns a mutable view of the file content.
    ///
    /// The view covers the logical length only; it cannot extend the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer fails validation.
    pub fn contents_mut(&mut self) -> VfsResult<BufferViewMut<'_>> {
        self.buffer.view_mut(self.apparent_size)
    }

    /// Consumes the file and returns its content.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer fails validation.
    pub fn into_bytes(self) -> VfsResult<Vec<u8>> {
        let bytes = self.contents()?.to_vec();
        Ok(bytes)
    }

    /// Lends a raw pointer to the payload. See [`GrowableBuffer::lend`].
    ///
    /// The returned length is the logical size, not the capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer fails validation.
    pub fn lend(&self) -> VfsResult<RawLoan> {
        let loan = self.buffer.lend()?;
        Ok(RawLoan {
            ptr: loan.ptr,
            len: self.apparent_size as usize,
        })
    }

    /// Returns a loan taken with [`MemoryFile::lend`].
    pub fn reclaim(&self) -> bool {
        self.buffer.reclaim()
    }

    fn seek_target(&self, offset: i64, whence: Whence) -> VfsResult<u64> {
        let invalid = || VfsError::InvalidSeek {
            offset,
            whence: whence.as_raw(),
        };
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.apparent_size,
        };
        let base = i64::try_from(base).map_err(|_| invalid())?;
        let target = base.checked_add(offset).ok_or_else(invalid)?;
        u64::try_from(target).map_err(|_| invalid())
    }
}

impl VfsBackend for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        check_io_len(buf.len())?;
        let end = self
            .position
            .saturating_add(buf.len() as u64)
            .min(self.apparent_size);
        let count = end.saturating_sub(self.position) as usize;
        if count == 0 {
            return Ok(0);
        }

        self.buffer.read_at(self.position, &mut buf[..count])?;
        self.position = end;
        trace!(count, position = self.position, "memory read");
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> VfsResult<usize> {
        check_io_len(data.len())?;
        if data.is_empty() {
            return Ok(0);
        }

        let end = self
            .position
            .checked_add(data.len() as u64)
            .ok_or(VfsError::Overflow {
                requested: data.len() as u64,
            })?;
        self.buffer.ensure_capacity(end)?;
        self.buffer.write_at(self.position, data)?;

        self.position = end;
        self.apparent_size = self.apparent_size.max(end);
        trace!(
            count = data.len(),
            position = self.position,
            size = self.apparent_size,
            "memory write"
        );
        Ok(data.len())
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> VfsResult<u64> {
        self.buffer.validate()?;
        let target = self.seek_target(offset, whence)?;
        if target >= self.apparent_size {
            // Only storage grows here; the logical size waits for a write.
            self.buffer.ensure_capacity(target)?;
        }
        self.position = target;
        trace!(offset, ?whence, position = target, "memory seek");
        Ok(target)
    }

    fn size(&self) -> VfsResult<u64> {
        self.buffer.validate()?;
        Ok(self.apparent_size)
    }

    fn is_memory_backed(&self) -> bool {
        true
    }

    fn sync(&mut self) -> VfsResult<()> {
        // Nothing is ever persisted
        Ok(())
    }
}
