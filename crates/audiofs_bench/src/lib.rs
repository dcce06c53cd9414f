//! Shared helpers for the AudioFS benchmarks.

#![warn(missing_docs)]

pub mod utils;
