//! # AudioFS FFI
//!
//! C ABI over [`audiofs_vfile::VirtualFile`], shaped as the custom I/O
//! callbacks a media library expects.
//!
//! This crate provides:
//! - `open`/`close` entry points returning an opaque handle
//! - `read`/`write`/`seek` callbacks taking the handle as `void *opaque`
//! - Negative `AVERROR(errno)` return codes
//! - A thread-local last-error message for diagnostics
//!
//! ## Ownership
//!
//! A handle returned by `audiofs_vfile_open` is owned by the caller and must
//! be released with exactly one call to `audiofs_vfile_close`. A pointer
//! obtained from `audiofs_vfile_lend` stays valid until the matching
//! `audiofs_vfile_reclaim`; the buffer will not grow in between. Closing a
//! handle with a loan outstanding is refused with `AVERROR(EBUSY)` and leaves
//! the handle open.

#![warn(missing_docs)]

mod error;
mod types;
mod vfile;

pub use error::{
    audiofs_clear_error, audiofs_get_last_error, averror, clear_last_error, set_last_error,
};
pub use types::{AudiofsVfile, AVSEEK_FORCE, AVSEEK_SIZE};
pub use vfile::{
    audiofs_vfile_close, audiofs_vfile_is_memory_backed, audiofs_vfile_lend, audiofs_vfile_open,
    audiofs_vfile_open_memory, audiofs_vfile_read, audiofs_vfile_reclaim, audiofs_vfile_seek,
    audiofs_vfile_size, audiofs_vfile_write,
};
