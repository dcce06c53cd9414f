//! Capacity growth policy for memory-backed files.
//!
//! Capacity grows in discrete size classes so that a stream of small writes
//! costs a bounded number of reallocations:
//!
//! | current capacity | next target        |
//! |------------------|--------------------|
//! | < 64 KiB         | 64 KiB             |
//! | < 1 MiB          | 1 MiB              |
//! | < 16 MiB         | 16 MiB             |
//! | >= 16 MiB        | + 16 MiB           |

/// First size class (64 KiB).
pub const SMALL_CLASS: u64 = 64 * 1024;
/// Second size class (1 MiB).
pub const MEDIUM_CLASS: u64 = 1024 * 1024;
/// Third size class and the increment beyond it (16 MiB).
pub const LARGE_CLASS: u64 = 16 * 1024 * 1024;

/// Returns the capacity one band above `capacity`.
///
/// Returns `None` if the next class cannot be represented.
#[must_use]
pub const fn next_size_class(capacity: u64) -> Option<u64> {
    if capacity < SMALL_CLASS {
        Some(SMALL_CLASS)
    } else if capacity < MEDIUM_CLASS {
        Some(MEDIUM_CLASS)
    } else if capacity < LARGE_CLASS {
        Some(LARGE_CLASS)
    } else {
        capacity.checked_add(LARGE_CLASS)
    }
}

/// Walks the size classes from `current` until `required` fits.
///
/// Returns `current` unchanged if it already satisfies `required`, and
/// `None` if the resulting capacity cannot be represented.
#[must_use]
pub fn target_capacity(current: u64, required: u64) -> Option<u64> {
    let mut capacity = current;
    while capacity < required && capacity < LARGE_CLASS {
        capacity = next_size_class(capacity)?;
    }
    if capacity >= required {
        return Some(capacity);
    }
    // Past the last fixed class every step is a flat increment.
    let steps = (required - capacity).div_ceil(LARGE_CLASS);
    capacity.checked_add(steps.checked_mul(LARGE_CLASS)?)
}

/// Lists the bands visited on the way from `current` to `required`.
///
/// At most `limit` entries are returned; an unreachable `required` yields
/// an empty schedule.
#[must_use]
pub fn schedule(current: u64, required: u64, limit: usize) -> Vec<u64> {
    if target_capacity(current, required).is_none() {
        return Vec::new();
    }
    let mut steps = Vec::new();
    let mut capacity = current;
    while capacity < required && steps.len() < limit {
        match next_size_class(capacity) {
            Some(next) => {
                steps.push(next);
                capacity = next;
            }
            None => break,
        }
    }
    steps
}
