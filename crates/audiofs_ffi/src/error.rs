//! Error codes and the thread-local last error.

use audiofs_vfile::VfsError;
use std::cell::RefCell;
use std::ffi::{c_char, c_int, CString};

/// Converts an error to the media library's negative `AVERROR(errno)` code.
pub fn averror(err: &VfsError) -> c_int {
    -err.errno()
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its negative code.
pub(crate) fn report(err: &VfsError) -> c_int {
    set_last_error(err.to_string());
    averror(err)
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn audiofs_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn audiofs_clear_error() {
    clear_last_error();
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiofs_vfile::errno;

    #[test]
    fn averror_is_negative_errno() {
        assert_eq!(
            averror(&VfsError::AllocationFailed { requested: 1 }),
            -errno::ENOMEM
        );
        assert_eq!(averror(&VfsError::Overflow { requested: 1 }), -errno::EOVERFLOW);
        assert_eq!(
            averror(&VfsError::InvalidSeek {
                offset: -1,
                whence: 2
            }),
            -errno::EINVAL
        );
        assert_eq!(averror(&VfsError::BufferLent), -errno::EBUSY);
        assert_eq!(
            averror(&VfsError::Corrupted("canary".into())),
            -errno::EFAULT
        );
    }

    #[test]
    fn report_sets_message() {
        clear_last_error();
        let code = report(&VfsError::EmptyFile);
        assert_eq!(code, -errno::EIO);

        let ptr = audiofs_get_last_error();
        assert!(!ptr.is_null());
        // Safety: we just set it
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), VfsError::EmptyFile.to_string());
    }

    #[test]
    fn last_error() {
        clear_last_error();
        assert!(audiofs_get_last_error().is_null());

        set_last_error("test error");
        let ptr = audiofs_get_last_error();
        assert!(!ptr.is_null());

        // Safety: we just set it
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "test error");

        audiofs_clear_error();
        assert!(audiofs_get_last_error().is_null());
    }
}
