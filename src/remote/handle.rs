//! Opaque reference to a region inside another process

use serde::{Deserialize, Serialize};

use crate::error::{MemFrameError, Result};

/// Location of a region in some process's address space
///
/// The address is never turned into a pointer; it is only handed to a
/// [`super::ProcessMemory`] capability together with a bounds-checked
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle {
    pub pid: i32,
    pub base_address: u64,
    pub length: usize,
}

impl RemoteHandle {
    pub fn new(pid: i32, base_address: u64, length: usize) -> Self {
        Self {
            pid,
            base_address,
            length,
        }
    }

    /// One past the last byte of the region
    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.length as u64)
    }

    /// Absolute address of `offset`, provided `len` bytes from there stay inside the region
    pub fn address_of(&self, offset: usize, len: usize) -> Result<u64> {
        match offset.checked_add(len) {
            Some(end) if end <= self.length => Ok(self.base_address + offset as u64),
            _ => Err(MemFrameError::out_of_bounds(offset, len, self.length)),
        }
    }

    /// Whether `address` falls inside the region
    pub fn contains(&self, address: u64) -> bool {
        address >= self.base_address && address < self.end_address()
    }
}

impl std::fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pid {} @ {:#x}..{:#x} ({} bytes)",
            self.pid,
            self.base_address,
            self.end_address(),
            self.length
        )
    }
}
