//! Type definitions for FFI.

/// An opaque virtual file handle.
///
/// This is a pointer to the internal `VirtualFile`. The same pointer is
/// passed to the I/O callbacks as their `opaque` argument.
/// Never dereference or modify directly.
#[repr(C)]
pub struct AudiofsVfile {
    _private: [u8; 0],
}

/// Seek flag asking for the stream size instead of moving the cursor.
pub const AVSEEK_SIZE: i32 = 0x10000;

/// Seek flag allowing the callee to seek by any means. Carries no meaning
/// for virtual files and is ignored.
pub const AVSEEK_FORCE: i32 = 0x20000;
