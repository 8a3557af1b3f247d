//! Scan configuration

use serde::{Deserialize, Serialize};

use crate::{
    error::{MemFrameError, Result},
    region_layout::MAGIC_SIZE,
};

/// Default number of bytes read from the target per request (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Options controlling a discovery scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Only scan ranges the target can write to
    pub writeable_only: bool,
    /// Bytes read per request
    pub chunk_size: usize,
    /// Only consider start markers inside `[lo, hi)`
    pub address_window: Option<(u64, u64)>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            writeable_only: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            address_window: None,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include read-only ranges in the scan
    pub fn with_writeable_only(mut self, writeable_only: bool) -> Self {
        self.writeable_only = writeable_only;
        self
    }

    /// Set the per-request read size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Restrict the scan to an address interval
    pub fn within(mut self, lo: u64, hi: u64) -> Self {
        self.address_window = Some((lo, hi));
        self
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < 2 * MAGIC_SIZE {
            return Err(MemFrameError::invalid_parameter(
                "chunk_size",
                format!("Chunk size must be at least {} bytes", 2 * MAGIC_SIZE),
            ));
        }
        if let Some((lo, hi)) = self.address_window {
            if lo >= hi {
                return Err(MemFrameError::invalid_parameter(
                    "address_window",
                    "Window start must be below window end",
                ));
            }
        }
        Ok(())
    }

    /// Window bounds, the whole address space when unset
    pub(crate) fn bounds(&self) -> (u64, u64) {
        self.address_window.unwrap_or((0, u64::MAX))
    }
}
