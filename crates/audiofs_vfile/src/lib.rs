//! # AudioFS Virtual Files
//!
//! File-like storage handed to a media library's custom I/O callbacks.
//!
//! A [`VirtualFile`] keeps its bytes either in a self-growing in-process
//! buffer or in an OS file opened for synchronous writes. Both present the
//! same cursor-based read, write and seek contract, so an encoder can
//! produce its output without caring where it lands.
//!
//! ## Design Principles
//!
//! - Memory storage grows in size classes and never moves while borrowed
//! - Every memory operation validates the buffer's header and trailing canary
//! - A seek past the end reserves space but does not change the logical size
//! - Disk writes are durable when `write` returns
//!
//! ## Available Backends
//!
//! - [`MemoryFile`] - growable buffer with apparent-size tracking
//! - [`DiskFile`] - OS file with synchronous writes and an exclusive lock
//!
//! ## Example
//!
//! ```rust
//! use audiofs_vfile::{VfsTarget, VirtualFile, VfsConfig, Whence};
//!
//! let mut file = VirtualFile::open(VfsTarget::parse("memory"), &VfsConfig::default()).unwrap();
//! file.seek(8, Whence::Start).unwrap();
//! file.write(b"data").unwrap();
//! assert_eq!(file.size().unwrap(), 12);
//!
//! let bytes = file.into_bytes().unwrap();
//! assert_eq!(&bytes[8..], b"data");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod buffer;
mod config;
mod error;
mod file;
pub mod growth;
mod memory;
mod types;
mod vfile;

pub use backend::{VfsBackend, MAX_IO_LEN};
pub use buffer::{
    guard_pattern, BufferView, BufferViewMut, GrowableBuffer, RawLoan, GUARD_COOKIE, GUARD_LEN,
};
pub use config::VfsConfig;
pub use error::{errno, VfsError, VfsResult};
pub use file::DiskFile;
pub use memory::MemoryFile;
pub use types::{VfsTarget, Whence, MEMORY_TARGET_NAME};
pub use vfile::VirtualFile;
