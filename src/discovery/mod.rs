//! Locating a frame region by its markers
//!
//! The producer does not know where the consumer allocated its region.
//! It reads the consumer's mapped ranges, looks for the start marker and
//! accepts a hit only when the end marker sits exactly `magic_end_offset()`
//! bytes further on. A scan is a point-in-time snapshot of a live process;
//! ranges that fail to read are logged and skipped.

pub mod options;
pub mod scanner;

pub use options::{ScanOptions, DEFAULT_CHUNK_SIZE};
pub use scanner::{discover, find_all, narrow, revalidate, scan, ScanReport};
