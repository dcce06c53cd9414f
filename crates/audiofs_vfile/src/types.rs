//! Open targets and seek origins.

use crate::error::{VfsError, VfsResult};
use std::path::{Path, PathBuf};

/// Name that selects the memory backend when a target is given as a string.
pub const MEMORY_TARGET_NAME: &str = "memory";

/// Where a virtual file keeps its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsTarget {
    /// A self-growing in-process buffer. Never persisted.
    Memory,
    /// A file on disk, created or truncated on open.
    Path(PathBuf),
}

impl VfsTarget {
    /// Creates a disk target.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        VfsTarget::Path(path.into())
    }

    /// Interprets a name coming from a string-typed interface.
    ///
    /// `"memory"` selects the memory backend; anything else is a path.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == MEMORY_TARGET_NAME {
            VfsTarget::Memory
        } else {
            VfsTarget::Path(PathBuf::from(name))
        }
    }

    /// Returns true for the memory backend.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, VfsTarget::Memory)
    }

    /// Returns the disk path, if any.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            VfsTarget::Memory => None,
            VfsTarget::Path(path) => Some(path),
        }
    }
}

/// Origin of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Offset is absolute (`SEEK_SET`).
    Start,
    /// Offset is relative to the cursor (`SEEK_CUR`).
    Current,
    /// Offset is relative to the logical end (`SEEK_END`).
    End,
}

impl Whence {
    /// Raw `SEEK_SET` value.
    pub const SEEK_SET: i32 = 0;
    /// Raw `SEEK_CUR` value.
    pub const SEEK_CUR: i32 = 1;
    /// Raw `SEEK_END` value.
    pub const SEEK_END: i32 = 2;

    /// Converts a raw POSIX whence value.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidSeek`] for unknown values.
    pub fn from_raw(whence: i32, offset: i64) -> VfsResult<Self> {
        match whence {
            Self::SEEK_SET => Ok(Whence::Start),
            Self::SEEK_CUR => Ok(Whence::Current),
            Self::SEEK_END => Ok(Whence::End),
            _ => Err(VfsError::InvalidSeek { offset, whence }),
        }
    }

    /// Returns the raw POSIX value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Whence::Start => Self::SEEK_SET,
            Whence::Current => Self::SEEK_CUR,
            Whence::End => Self::SEEK_END,
        }
    }
}
