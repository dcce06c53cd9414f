//! Virtual file configuration.

/// Configuration for opening a virtual file.
#[derive(Debug, Clone)]
pub struct VfsConfig {
    /// Initial payload capacity of a memory-backed file.
    pub initial_capacity: u64,

    /// Whether every disk write is committed to stable storage before returning.
    pub sync_writes: bool,

    /// Whether the disk backend takes an exclusive lock on its path.
    pub exclusive_lock: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            sync_writes: true,
            exclusive_lock: true,
        }
    }
}

impl VfsConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial capacity for memory-backed files.
    #[must_use]
    pub const fn initial_capacity(mut self, bytes: u64) -> Self {
        self.initial_capacity = bytes;
        self
    }

    /// Sets whether disk writes are synced before returning.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets whether the disk backend locks its path exclusively.
    #[must_use]
    pub const fn exclusive_lock(mut self, value: bool) -> Self {
        self.exclusive_lock = value;
        self
    }
}
