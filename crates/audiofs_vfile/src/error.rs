//! Error types for virtual file operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for virtual file operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// Errors that can occur during virtual file operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// An I/O error occurred in the disk backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Memory for the buffer could not be obtained.
    #[error("allocation of {requested} bytes failed")]
    AllocationFailed {
        /// The payload size that was requested.
        requested: u64,
    },

    /// A length or size is outside the representable range.
    #[error("size {requested} is out of range")]
    Overflow {
        /// The offending size.
        requested: u64,
    },

    /// The computed seek target is not a valid position.
    #[error("invalid seek: offset {offset} with whence {whence}")]
    InvalidSeek {
        /// The requested offset.
        offset: i64,
        /// The raw whence value passed by the caller.
        whence: i32,
    },

    /// The buffer guard, self-check or canary did not validate.
    ///
    /// This is never recoverable: the buffer refuses all further use.
    #[error("buffer corrupted: {0}")]
    Corrupted(String),

    /// A resize was attempted while a pointer into the buffer is lent out.
    #[error("buffer is lent to an external caller")]
    BufferLent,

    /// A disk-backed file reported zero bytes.
    #[error("file has no content")]
    EmptyFile,

    /// The path is held exclusively by another handle.
    #[error("file is locked: {0}")]
    Locked(PathBuf),
}

/// POSIX errno values used for the C ABI mapping.
pub mod errno {
    /// I/O error.
    pub const EIO: i32 = 5;
    /// Resource temporarily unavailable.
    pub const EAGAIN: i32 = 11;
    /// Out of memory.
    pub const ENOMEM: i32 = 12;
    /// Bad address.
    pub const EFAULT: i32 = 14;
    /// Device or resource busy.
    pub const EBUSY: i32 = 16;
    /// Invalid argument.
    pub const EINVAL: i32 = 22;
    /// Value too large for defined data type.
    pub const EOVERFLOW: i32 = 75;
}

impl VfsError {
    /// Returns true if the error means the handle must not be used again.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, VfsError::Corrupted(_))
    }

    /// Returns the positive errno value that best describes this error.
    ///
    /// OS errors keep their raw code when one is available.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::Io(e) => e.raw_os_error().unwrap_or(errno::EIO),
            VfsError::AllocationFailed { .. } => errno::ENOMEM,
            VfsError::Overflow { .. } => errno::EOVERFLOW,
            VfsError::InvalidSeek { .. } => errno::EINVAL,
            VfsError::Corrupted(_) => errno::EFAULT,
            VfsError::BufferLent => errno::EBUSY,
            VfsError::EmptyFile => errno::EIO,
            VfsError::Locked(_) => errno::EAGAIN,
        }
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::Io(e) => e,
            VfsError::AllocationFailed { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            VfsError::Overflow { .. } | VfsError::InvalidSeek { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            VfsError::BufferLent | VfsError::Locked(_) => {
                io::Error::new(io::ErrorKind::WouldBlock, err)
            }
            VfsError::EmptyFile => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            VfsError::Corrupted(_) => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_is_fatal() {
        assert!(VfsError::Corrupted("canary".into()).is_fatal());
        assert!(!VfsError::BufferLent.is_fatal());
        assert!(!VfsError::Overflow { requested: 1 }.is_fatal());
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(VfsError::AllocationFailed { requested: 1 }.errno(), errno::ENOMEM);
        assert_eq!(VfsError::Overflow { requested: 1 }.errno(), errno::EOVERFLOW);
        assert_eq!(
            VfsError::InvalidSeek {
                offset: -1,
                whence: 2
            }
            .errno(),
            errno::EINVAL
        );
        assert_eq!(VfsError::BufferLent.errno(), errno::EBUSY);
    }

    #[test]
    fn errno_keeps_os_code() {
        let err = VfsError::Io(io::Error::from_raw_os_error(2));
        assert_eq!(err.errno(), 2);

        let err = VfsError::Io(io::Error::new(io::ErrorKind::Other, "synthetic"));
        assert_eq!(err.errno(), errno::EIO);
    }

    #[test]
    fn converts_into_io_error() {
        let io_err: io::Error = VfsError::Overflow { requested: 7 }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);

        let io_err: io::Error = VfsError::Corrupted("x".into()).into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
    }
}
