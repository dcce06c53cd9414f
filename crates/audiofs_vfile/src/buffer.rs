//! Growable, integrity-checked byte buffer.
//!
//! [`GrowableBuffer`] owns the payload of a memory-backed virtual file. The
//! payload is stored in a `Vec<u8>` followed by [`GUARD_LEN`] canary bytes
//! holding [`GUARD_COOKIE`]. The cookie and a self-check value are tracked
//! beside the region, and every public operation validates all three before
//! touching the data.
//!
//! ## Locking
//!
//! The region sits behind a `parking_lot::RwLock`. Its write half is the
//! resize lock: resizes are serialized by it and it is released on every
//! exit path by the guard's `Drop`.
//!
//! ## Borrowing
//!
//! - [`BufferView`] / [`BufferViewMut`] are scoped views that hold the lock
//!   for their lifetime. A resize requested while a view is alive fails with
//!   [`VfsError::BufferLent`] instead of waiting on it.
//! - [`GrowableBuffer::lend`] records that a raw pointer has left Rust (the C
//!   ABI). Resizing is refused until [`GrowableBuffer::reclaim`] is called.
//!
//! ## Corruption
//!
//! A failed validation poisons the buffer. Every later call reports
//! [`VfsError::Corrupted`]; no repair is attempted.

use crate::error::{VfsError, VfsResult};
use crate::growth;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, error, trace};

/// Guard cookie written after the payload.
pub const GUARD_COOKIE: u32 = 0xd0d0_cafe;

/// Number of trailing canary bytes.
pub const GUARD_LEN: usize = 8;

const SELF_MAGIC: u64 = 0xdead_beef_0000_0000;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns the canary pattern: the cookie repeated to fill [`GUARD_LEN`] bytes.
#[must_use]
pub const fn guard_pattern() -> [u8; GUARD_LEN] {
    let c = GUARD_COOKIE.to_le_bytes();
    [c[0], c[1], c[2], c[3], c[0], c[1], c[2], c[3]]
}

/// Payload plus trailing canary.
///
/// `bytes.len() == capacity + GUARD_LEN` whenever `capacity > 0`, and
/// `bytes` is empty when the payload has been released.
struct Region {
    bytes: Vec<u8>,
    capacity: usize,
}

/// A raw pointer into the payload handed to an external caller.
#[derive(Debug, Clone, Copy)]
pub struct RawLoan {
    /// Start of the payload.
    pub ptr: *mut u8,
    /// Number of payload bytes the pointer may address.
    pub len: usize,
}

/// A resizable byte region with an integrity guard and a resize lock.
pub struct GrowableBuffer {
    cookie: u32,
    id: u64,
    self_check: u64,
    region: RwLock<Region>,
    capacity: AtomicU64,
    views: AtomicUsize,
    lent: AtomicUsize,
    poisoned: AtomicBool,
}

impl GrowableBuffer {
    /// Allocates a buffer with `capacity` zeroed payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if the size cannot be represented and
    /// [`VfsError::AllocationFailed`] if the memory cannot be obtained.
    pub fn alloc(capacity: u64) -> VfsResult<Self> {
        let region = Region::allocate(capacity)?;
        let published = region.capacity as u64;
        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        trace!(id, capacity, "allocated buffer");

        Ok(Self {
            cookie: GUARD_COOKIE,
            id,
            self_check: id ^ SELF_MAGIC,
            region: RwLock::new(region),
            capacity: AtomicU64::new(published),
            views: AtomicUsize::new(0),
            lent: AtomicUsize::new(0),
            poisoned: AtomicBool::new(false),
        })
    }

    /// Returns the process-unique identity of this buffer.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the number of payload bytes currently allocated.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }

    /// Returns true once a validation has failed.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Returns true while a raw pointer is lent out.
    #[must_use]
    pub fn is_lent(&self) -> bool {
        self.lent.load(Ordering::Acquire) > 0
    }

    /// Checks the cookie, the self-check value and the trailing canary.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Corrupted`] on any mismatch. The buffer is then
    /// poisoned and refuses all further use.
    pub fn validate(&self) -> VfsResult<()> {
        self.validate_header()?;
        let region = self.lock_shared()?;
        self.validate_region(&region)
    }

    /// Resizes the payload to exactly `new_size` bytes.
    ///
    /// - `0` releases the payload; the buffer stays usable.
    /// - The current capacity is a no-op.
    /// - Anything else reallocates. Bytes exposed by the change are zero and
    ///   the canary is rewritten after the new payload end.
    ///
    /// On failure the buffer is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`VfsError::Overflow`] if `new_size` cannot be represented
    /// - [`VfsError::BufferLent`] while a view or raw loan is outstanding
    /// - [`VfsError::AllocationFailed`] if reallocation fails
    /// - [`VfsError::Corrupted`] if validation fails
    pub fn resize(&self, new_size: u64) -> VfsResult<()> {
        self.validate_header()?;
        let mut region = self.lock_exclusive()?;
        self.validate_region(&region)?;
        self.resize_locked(&mut region, new_size)
    }

    /// Grows the payload along the size classes until it holds `required` bytes.
    ///
    /// The final class is computed first and the buffer is resized once, so
    /// a failure leaves the capacity untouched. Never shrinks.
    ///
    /// Returns the capacity after the call.
    ///
    /// # Errors
    ///
    /// Same as [`GrowableBuffer::resize`].
    pub fn ensure_capacity(&self, required: u64) -> VfsResult<u64> {
        self.validate_header()?;
        {
            let region = self.lock_shared()?;
            self.validate_region(&region)?;
            if region.capacity as u64 >= required {
                return Ok(region.capacity as u64);
            }
        }

        let mut region = self.lock_exclusive()?;
        self.validate_region(&region)?;
        let current = region.capacity as u64;
        if current >= required {
            return Ok(current);
        }

        let target = growth::target_capacity(current, required)
            .ok_or(VfsError::Overflow { requested: required })?;
        debug!(id = self.id, from = current, to = target, required, "growing buffer");
        self.resize_locked(&mut region, target)?;
        Ok(target)
    }

    /// Copies `out.len()` bytes starting at `offset` into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if the range exceeds the capacity.
    pub fn read_at(&self, offset: u64, out: &mut [u8]) -> VfsResult<()> {
        self.validate_header()?;
        let region = self.lock_shared()?;
        self.validate_region(&region)?;
        let range = region.payload_range(offset, out.len())?;
        out.copy_from_slice(&region.bytes[range]);
        Ok(())
    }

    /// Copies `data` into the payload starting at `offset`.
    ///
    /// The range must already lie within the capacity.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if the range exceeds the capacity.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> VfsResult<()> {
        self.validate_header()?;
        let mut region = self.lock_exclusive()?;
        self.validate_region(&region)?;
        let range = region.payload_range(offset, data.len())?;
        region.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Returns a read-only view of the first `len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if `len` exceeds the capacity.
    pub fn view(&self, len: u64) -> VfsResult<BufferView<'_>> {
        self.validate_header()?;
        let guard = self.lock_shared()?;
        self.validate_region(&guard)?;
        let len = guard.payload_range(0, to_usize(len)?)?.end;
        self.views.fetch_add(1, Ordering::AcqRel);
        Ok(BufferView {
            guard,
            len,
            views: &self.views,
        })
    }

    /// Returns a mutable view of the first `len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Overflow`] if `len` exceeds the capacity and
    /// [`VfsError::BufferLent`] if another view is alive.
    pub fn view_mut(&self, len: u64) -> VfsResult<BufferViewMut<'_>> {
        self.validate_header()?;
        let guard = self.lock_exclusive()?;
        self.validate_region(&guard)?;
        let len = guard.payload_range(0, to_usize(len)?)?.end;
        self.views.fetch_add(1, Ordering::AcqRel);
        Ok(BufferViewMut {
            guard,
            len,
            views: &self.views,
        })
    }

    /// Lends a raw pointer to the payload to an external caller.
    ///
    /// Resizing is refused until every loan is returned with
    /// [`GrowableBuffer::reclaim`].
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::Corrupted`] if validation fails.
    pub fn lend(&self) -> VfsResult<RawLoan> {
        self.validate_header()?;
        let mut region = self.lock_exclusive()?;
        self.validate_region(&region)?;
        self.lent.fetch_add(1, Ordering::AcqRel);
        let len = region.capacity;
        let ptr = region.bytes.as_mut_ptr();
        debug!(id = self.id, len, "buffer lent");
        Ok(RawLoan { ptr, len })
    }

    /// Returns one outstanding loan.
    ///
    /// Returns false if nothing was lent.
    pub fn reclaim(&self) -> bool {
        let returned = self
            .lent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if returned {
            debug!(id = self.id, "buffer reclaimed");
        }
        returned
    }

    fn validate_header(&self) -> VfsResult<()> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(VfsError::Corrupted(format!(
                "buffer {} previously failed validation",
                self.id
            )));
        }
        if self.cookie != GUARD_COOKIE {
            return Err(self.poison(format!("cookie mismatch: {:#x}", self.cookie)));
        }
        if self.self_check != self.id ^ SELF_MAGIC {
            return Err(self.poison("self-check mismatch".to_string()));
        }
        Ok(())
    }

    fn validate_region(&self, region: &Region) -> VfsResult<()> {
        if region.capacity == 0 {
            if region.bytes.is_empty() {
                return Ok(());
            }
            return Err(self.poison("released buffer still holds bytes".to_string()));
        }
        match region.bytes.get(region.capacity..) {
            Some(tail) if tail == guard_pattern() => Ok(()),
            _ => Err(self.poison(format!(
                "canary mismatch after {} payload bytes",
                region.capacity
            ))),
        }
    }

    fn poison(&self, reason: String) -> VfsError {
        self.poisoned.store(true, Ordering::Release);
        error!(id = self.id, %reason, "buffer corruption detected");
        VfsError::Corrupted(reason)
    }

    /// Takes the read lock, failing fast if a mutable view would block it.
    fn lock_shared(&self) -> VfsResult<RwLockReadGuard<'_, Region>> {
        if let Some(guard) = self.region.try_read() {
            return Ok(guard);
        }
        if self.views.load(Ordering::Acquire) > 0 {
            return Err(VfsError::BufferLent);
        }
        Ok(self.region.read())
    }

    /// Takes the write lock, failing fast if a view would block it.
    fn lock_exclusive(&self) -> VfsResult<RwLockWriteGuard<'_, Region>> {
        if let Some(guard) = self.region.try_write() {
            return Ok(guard);
        }
        if self.views.load(Ordering::Acquire) > 0 {
            return Err(VfsError::BufferLent);
        }
        Ok(self.region.write())
    }

    fn resize_locked(&self, region: &mut Region, new_size: u64) -> VfsResult<()> {
        let new_capacity = to_usize(new_size)?;
        let total = Region::total_len(new_capacity, new_size)?;

        if new_capacity == region.capacity {
            return Ok(());
        }
        if self.lent.load(Ordering::Acquire) > 0 {
            return Err(VfsError::BufferLent);
        }

        if new_capacity == 0 {
            debug!(id = self.id, from = region.capacity, "releasing buffer");
            region.bytes = Vec::new();
            region.capacity = 0;
            self.capacity.store(0, Ordering::Release);
            return Ok(());
        }

        let additional = total.saturating_sub(region.bytes.len());
        region
            .bytes
            .try_reserve_exact(additional)
            .map_err(|_| VfsError::AllocationFailed { requested: new_size })?;

        let old_capacity = region.capacity;
        region.bytes.truncate(old_capacity.min(new_capacity));
        region.bytes.resize(new_capacity, 0);
        region.bytes.extend_from_slice(&guard_pattern());
        if new_capacity < old_capacity {
            region.bytes.shrink_to_fit();
        }
        region.capacity = new_capacity;
        self.capacity.store(new_size, Ordering::Release);

        trace!(id = self.id, from = old_capacity, to = new_capacity, "resized buffer");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn corrupt_canary(&self) {
        let mut region = self.region.write();
        let last = region.bytes.len() - 1;
        region.bytes[last] ^= 0xff;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_cookie(&mut self) {
        self.cookie = 0xdead_beef;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_self_check(&mut self) {
        self.self_check ^= 1;
    }

    #[cfg(test)]
    pub(crate) fn guard_bytes(&self) -> Vec<u8> {
        let region = self.region.read();
        region.bytes[region.capacity..].to_vec()
    }
}

impl std::fmt::Debug for GrowableBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("lent", &self.lent.load(Ordering::Relaxed))
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}

impl Region {
    fn allocate(capacity: u64) -> VfsResult<Self> {
        let payload = to_usize(capacity)?;
        if payload == 0 {
            return Ok(Self {
                bytes: Vec::new(),
                capacity: 0,
            });
        }

        let total = Self::total_len(payload, capacity)?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(total)
            .map_err(|_| VfsError::AllocationFailed { requested: capacity })?;
        bytes.resize(payload, 0);
        bytes.extend_from_slice(&guard_pattern());

        Ok(Self {
            bytes,
            capacity: payload,
        })
    }

    fn total_len(payload: usize, requested: u64) -> VfsResult<usize> {
        payload
            .checked_add(GUARD_LEN)
            .filter(|total| isize::try_from(*total).is_ok())
            .ok_or(VfsError::Overflow { requested })
    }

    fn payload_range(&self, offset: u64, len: usize) -> VfsResult<std::ops::Range<usize>> {
        let start = to_usize(offset)?;
        let end = start
            .checked_add(len)
            .ok_or(VfsError::Overflow { requested: offset })?;
        if end > self.capacity {
            return Err(VfsError::Overflow {
                requested: end as u64,
            });
        }
        Ok(start..end)
    }
}

fn to_usize(value: u64) -> VfsResult<usize> {
    usize::try_from(value).map_err(|_| VfsError::Overflow { requested: value })
}

/// A read-only view into a buffer's payload.
///
/// The buffer cannot be resized while the view is alive.
pub struct BufferView<'a> {
    guard: RwLockReadGuard<'a, Region>,
    len: usize,
    views: &'a AtomicUsize,
}

impl Deref for BufferView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard.bytes[..self.len]
    }
}

impl Drop for BufferView<'_> {
    fn drop(&mut self) {
        self.views.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for BufferView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferView").field("len", &self.len).finish()
    }
}

/// A mutable view into a buffer's payload.
///
/// The canary is never reachable through the view.
pub struct BufferViewMut<'a> {
    guard: RwLockWriteGuard<'a, Region>,
    len: usize,
    views: &'a AtomicUsize,
}

impl Deref for BufferViewMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard.bytes[..self.len]
    }
}

impl DerefMut for BufferViewMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard.bytes[..self.len]
    }
}

impl Drop for BufferViewMut<'_> {
    fn drop(&mut self) {
        self.views.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for BufferViewMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferViewMut").field("len", &self.len).finish()
    }
}
