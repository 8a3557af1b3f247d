//! A frame region reached through a foreign memory capability

use crate::{
    discovery::{self, ScanOptions},
    error::{MemFrameError, Result},
    ownership::Ownership,
    protocol::access::{check_frame_len, RegionAccess},
    region_layout::{RegionLayout, MAGIC_SIZE, OWNERSHIP_OFFSET, PAYLOAD_OFFSET},
};

use super::{handle::RemoteHandle, process::ProcessMemory};

/// Region living in another process
///
/// Every access is a separate read or write through `M`; the ownership
/// byte is written last, after the payload write has returned. Nothing
/// orders those writes as seen by the other process beyond that.
#[derive(Debug)]
pub struct RemoteRegion<M> {
    memory: M,
    handle: RemoteHandle,
    layout: RegionLayout,
}

impl<M: ProcessMemory> RemoteRegion<M> {
    /// Bind to a known region; the handle length must match the layout
    pub fn new(memory: M, handle: RemoteHandle, layout: RegionLayout) -> Result<Self> {
        if handle.length != layout.total_size() {
            return Err(MemFrameError::invalid_parameter(
                "handle",
                format!(
                    "Handle length {} does not match layout size {}",
                    handle.length,
                    layout.total_size()
                ),
            ));
        }
        if handle.pid != memory.pid() {
            return Err(MemFrameError::invalid_parameter(
                "handle",
                format!(
                    "Handle refers to pid {}, memory capability to pid {}",
                    handle.pid,
                    memory.pid()
                ),
            ));
        }
        Ok(Self {
            memory,
            handle,
            layout,
        })
    }

    /// Bind to the region at `base_address`, checking its markers first
    pub fn at_address(memory: M, base_address: u64, layout: RegionLayout) -> Result<Self> {
        let handle = RemoteHandle::new(memory.pid(), base_address, layout.total_size());
        let region = Self::new(memory, handle, layout)?;
        region.verify_markers()?;
        Ok(region)
    }

    /// Locate the single region in the target and bind to it
    pub fn discover(memory: M, layout: RegionLayout, options: &ScanOptions) -> Result<Self> {
        let handle = discovery::discover(&memory, &layout, options)?;
        Self::new(memory, handle, layout)
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }
}

impl<M: ProcessMemory> RegionAccess for RemoteRegion<M> {
    fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    fn load_ownership(&self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.memory
            .read_bytes(self.handle.address_of(OWNERSHIP_OFFSET, 1)?, &mut byte)?;
        Ok(byte[0])
    }

    fn store_ownership(&self, state: Ownership) -> Result<()> {
        self.memory
            .write_bytes(self.handle.address_of(OWNERSHIP_OFFSET, 1)?, &[state.as_byte()])
    }

    fn write_payload(&self, frame: &[u8]) -> Result<()> {
        check_frame_len(&self.layout, frame.len())?;
        self.memory
            .write_bytes(self.handle.address_of(PAYLOAD_OFFSET, frame.len())?, frame)
    }

    fn read_payload(&self, out: &mut [u8]) -> Result<()> {
        check_frame_len(&self.layout, out.len())?;
        self.memory
            .read_bytes(self.handle.address_of(PAYLOAD_OFFSET, out.len())?, out)
    }

    fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]> {
        let mut bytes = [0u8; MAGIC_SIZE];
        self.memory
            .read_bytes(self.handle.address_of(offset, MAGIC_SIZE)?, &mut bytes)?;
        Ok(bytes)
    }
}
