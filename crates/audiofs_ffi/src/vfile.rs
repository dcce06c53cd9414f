//! Virtual file FFI functions.

use crate::error::{clear_last_error, report, set_last_error};
use crate::types::{AudiofsVfile, AVSEEK_FORCE, AVSEEK_SIZE};
use audiofs_vfile::{errno, VfsConfig, VfsError, VfsTarget, VirtualFile, Whence};
use std::ffi::{c_char, c_int, c_void, CStr};
use tracing::warn;

/// Borrows the `VirtualFile` behind an opaque pointer.
///
/// # Safety
///
/// `opaque` must be null or a live handle from `audiofs_vfile_open*`.
unsafe fn handle_mut<'a>(opaque: *mut c_void) -> Option<&'a mut VirtualFile> {
    (opaque as *mut VirtualFile).as_mut()
}

fn null_handle() -> c_int {
    set_last_error("null pointer argument");
    -errno::EINVAL
}

fn into_handle(file: VirtualFile) -> *mut AudiofsVfile {
    Box::into_raw(Box::new(file)) as *mut AudiofsVfile
}

/// Opens a virtual file.
///
/// `name == "memory"` selects a self-growing memory buffer; any other value
/// is a filesystem path that is created or truncated.
///
/// # Returns
///
/// A handle, or null on failure (see `audiofs_get_last_error`).
///
/// # Safety
///
/// `name` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_open(name: *const c_char) -> *mut AudiofsVfile {
    clear_last_error();

    if name.is_null() {
        set_last_error("null pointer argument");
        return std::ptr::null_mut();
    }

    let name = match CStr::from_ptr(name).to_str() {
        Ok(s) => s,
        Err(_) => {
            set_last_error("invalid UTF-8 in name");
            return std::ptr::null_mut();
        }
    };

    match VirtualFile::open(VfsTarget::parse(name), &VfsConfig::default()) {
        Ok(file) => into_handle(file),
        Err(e) => {
            warn!(name, error = %e, "open failed");
            report(&e);
            std::ptr::null_mut()
        }
    }
}

/// Opens a memory-backed virtual file.
///
/// # Returns
///
/// A handle, or null on failure.
#[no_mangle]
pub extern "C" fn audiofs_vfile_open_memory() -> *mut AudiofsVfile {
    clear_last_error();

    match VirtualFile::open_memory() {
        Ok(file) => into_handle(file),
        Err(e) => {
            report(&e);
            std::ptr::null_mut()
        }
    }
}

/// Read callback.
///
/// # Returns
///
/// Bytes copied into `buf` (`0` at end of file), or a negative error code.
///
/// # Safety
///
/// - `opaque` must be a valid handle
/// - `buf` must be valid for `size` bytes of writes
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_read(
    opaque: *mut c_void,
    buf: *mut u8,
    size: c_int,
) -> c_int {
    clear_last_error();

    let Some(file) = handle_mut(opaque) else {
        return null_handle();
    };
    let Ok(len) = usize::try_from(size) else {
        return report(&VfsError::Overflow {
            requested: u64::from(size.unsigned_abs()),
        });
    };
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        return null_handle();
    }

    let buf = std::slice::from_raw_parts_mut(buf, len);
    match file.read(buf) {
        Ok(count) => count as c_int,
        Err(e) => report(&e),
    }
}

/// Write callback.
///
/// # Returns
///
/// Bytes written, or a negative error code.
///
/// # Safety
///
/// - `opaque` must be a valid handle
/// - `buf` must be valid for `size` bytes of reads
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_write(
    opaque: *mut c_void,
    buf: *const u8,
    size: c_int,
) -> c_int {
    clear_last_error();

    let Some(file) = handle_mut(opaque) else {
        return null_handle();
    };
    let Ok(len) = usize::try_from(size) else {
        return report(&VfsError::Overflow {
            requested: u64::from(size.unsigned_abs()),
        });
    };
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        return null_handle();
    }

    let data = std::slice::from_raw_parts(buf, len);
    match file.write(data) {
        Ok(count) => count as c_int,
        Err(e) => report(&e),
    }
}

/// Seek callback.
///
/// `whence` is `SEEK_SET`, `SEEK_CUR` or `SEEK_END`, optionally combined
/// with `AVSEEK_FORCE`. `AVSEEK_SIZE` returns the file size without moving
/// the cursor.
///
/// # Returns
///
/// The new absolute position (or the size), or a negative error code.
///
/// # Safety
///
/// `opaque` must be a valid handle.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_seek(
    opaque: *mut c_void,
    offset: i64,
    whence: c_int,
) -> i64 {
    clear_last_error();

    let Some(file) = handle_mut(opaque) else {
        return i64::from(null_handle());
    };

    if whence & AVSEEK_SIZE != 0 {
        return size_to_i64(file.size());
    }

    let result = Whence::from_raw(whence & !AVSEEK_FORCE, offset)
        .and_then(|whence| file.seek(offset, whence));
    size_to_i64(result)
}

/// Returns the logical size of the file.
///
/// # Returns
///
/// The size in bytes, or a negative error code. An empty disk file is an
/// error.
///
/// # Safety
///
/// `handle` must be a valid handle.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_size(handle: *mut AudiofsVfile) -> i64 {
    clear_last_error();

    match handle_mut(handle as *mut c_void) {
        Some(file) => size_to_i64(file.size()),
        None => i64::from(null_handle()),
    }
}

/// Returns true if the file lives in process memory.
///
/// # Safety
///
/// `handle` must be a valid handle or null.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_is_memory_backed(handle: *mut AudiofsVfile) -> bool {
    handle_mut(handle as *mut c_void).is_some_and(|file| file.is_memory_backed())
}

/// Lends the content of a memory file to the caller.
///
/// On success `*out_ptr` points at the first byte and `*out_len` holds the
/// logical size. The memory is not moved or resized until
/// `audiofs_vfile_reclaim` is called; writes that need to grow the buffer
/// fail with `AVERROR(EBUSY)` in the meantime.
///
/// # Returns
///
/// `0` on success, or a negative error code. Disk files return
/// `AVERROR(EINVAL)`.
///
/// # Safety
///
/// - `handle` must be a valid handle
/// - `out_ptr` and `out_len` must be valid pointers
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_lend(
    handle: *mut AudiofsVfile,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    clear_last_error();

    if out_ptr.is_null() || out_len.is_null() {
        return null_handle();
    }
    let Some(file) = handle_mut(handle as *mut c_void) else {
        return null_handle();
    };
    let Some(memory) = file.as_memory() else {
        set_last_error("only memory-backed files can be lent");
        return -errno::EINVAL;
    };

    match memory.lend() {
        Ok(loan) => {
            *out_ptr = loan.ptr;
            *out_len = loan.len;
            0
        }
        Err(e) => report(&e),
    }
}

/// Ends a loan taken with `audiofs_vfile_lend`.
///
/// # Returns
///
/// True if a loan was outstanding.
///
/// # Safety
///
/// `handle` must be a valid handle or null. The lent pointer must not be
/// used after this call.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_reclaim(handle: *mut AudiofsVfile) -> bool {
    handle_mut(handle as *mut c_void)
        .and_then(|file| file.as_memory())
        .is_some_and(|memory| memory.reclaim())
}

/// Closes a virtual file and releases the handle.
///
/// Memory content is discarded. Null is accepted and ignored.
///
/// # Returns
///
/// 0 on success. `AVERROR(EBUSY)` if a pointer from `audiofs_vfile_lend` is
/// still outstanding; the handle is then left open and must be closed again
/// after `audiofs_vfile_reclaim`. Any other negative code means the handle
/// was released but the close itself failed.
///
/// # Safety
///
/// The handle must have been returned by `audiofs_vfile_open` or
/// `audiofs_vfile_open_memory`. Unless `AVERROR(EBUSY)` was returned, the
/// handle must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn audiofs_vfile_close(handle: *mut AudiofsVfile) -> c_int {
    clear_last_error();

    if handle.is_null() {
        return 0;
    }

    if handle_mut(handle as *mut c_void).is_some_and(|file| file.is_lent()) {
        return report(&VfsError::BufferLent);
    }

    // Take ownership and drop
    let file = Box::from_raw(handle as *mut VirtualFile);
    match file.close() {
        Ok(()) => 0,
        Err(e) => report(&e),
    }
}
