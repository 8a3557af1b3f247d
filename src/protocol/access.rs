//! Byte-level access to a frame region, local or foreign

use std::sync::Arc;

use crate::{
    error::{MemFrameError, Result},
    memory::SharedRegion,
    ownership::Ownership,
    region_layout::{RegionLayout, MAGIC_SIZE, PAYLOAD_OFFSET},
};

/// The operations the handshake needs from a region
///
/// Implemented for regions in our own address space ([`SharedRegion`])
/// and for regions reached through a foreign memory capability
/// ([`crate::remote::RemoteRegion`]).
pub trait RegionAccess {
    fn layout(&self) -> &RegionLayout;

    /// Raw ownership byte as currently stored
    fn load_ownership(&self) -> Result<u8>;

    /// Store a new ownership state; must be ordered after prior payload writes
    fn store_ownership(&self, state: Ownership) -> Result<()>;

    /// Overwrite the payload; `frame` is exactly `payload_size()` bytes
    fn write_payload(&self, frame: &[u8]) -> Result<()>;

    /// Copy the payload into `out`, exactly `payload_size()` bytes
    fn read_payload(&self, out: &mut [u8]) -> Result<()>;

    /// Read the 4-byte marker at `offset`
    fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]>;

    /// Decoded ownership state
    fn ownership(&self) -> Result<Ownership> {
        Ownership::from_byte(self.load_ownership()?)
    }

    /// Check the trailing marker is intact
    fn verify_magic_end(&self) -> Result<()> {
        let offset = self.layout().magic_end_offset();
        if self.read_marker(offset)? != RegionLayout::magic_end_bytes() {
            return Err(MemFrameError::layout_corrupt("magic_end", offset));
        }
        Ok(())
    }

    /// Check both markers are intact
    fn verify_markers(&self) -> Result<()> {
        if self.read_marker(0)? != RegionLayout::magic_start_bytes() {
            return Err(MemFrameError::layout_corrupt("magic_start", 0));
        }
        self.verify_magic_end()
    }
}

impl RegionAccess for SharedRegion {
    fn layout(&self) -> &RegionLayout {
        SharedRegion::layout(self)
    }

    fn load_ownership(&self) -> Result<u8> {
        Ok(self.ownership_byte())
    }

    fn store_ownership(&self, state: Ownership) -> Result<()> {
        self.set_ownership(state);
        Ok(())
    }

    fn write_payload(&self, frame: &[u8]) -> Result<()> {
        check_frame_len(SharedRegion::layout(self), frame.len())?;
        self.write_at(PAYLOAD_OFFSET, frame)
    }

    fn read_payload(&self, out: &mut [u8]) -> Result<()> {
        check_frame_len(SharedRegion::layout(self), out.len())?;
        self.read_at(PAYLOAD_OFFSET, out)
    }

    fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]> {
        SharedRegion::read_marker(self, offset)
    }
}

impl<T: RegionAccess + ?Sized> RegionAccess for Arc<T> {
    fn layout(&self) -> &RegionLayout {
        (**self).layout()
    }

    fn load_ownership(&self) -> Result<u8> {
        (**self).load_ownership()
    }

    fn store_ownership(&self, state: Ownership) -> Result<()> {
        (**self).store_ownership(state)
    }

    fn write_payload(&self, frame: &[u8]) -> Result<()> {
        (**self).write_payload(frame)
    }

    fn read_payload(&self, out: &mut [u8]) -> Result<()> {
        (**self).read_payload(out)
    }

    fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]> {
        (**self).read_marker(offset)
    }
}

impl<T: RegionAccess + ?Sized> RegionAccess for &T {
    fn layout(&self) -> &RegionLayout {
        (**self).layout()
    }

    fn load_ownership(&self) -> Result<u8> {
        (**self).load_ownership()
    }

    fn store_ownership(&self, state: Ownership) -> Result<()> {
        (**self).store_ownership(state)
    }

    fn write_payload(&self, frame: &[u8]) -> Result<()> {
        (**self).write_payload(frame)
    }

    fn read_payload(&self, out: &mut [u8]) -> Result<()> {
        (**self).read_payload(out)
    }

    fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]> {
        (**self).read_marker(offset)
    }
}

/// Reject buffers that do not match the agreed payload size
pub(crate) fn check_frame_len(layout: &RegionLayout, len: usize) -> Result<()> {
    if len != layout.payload_size() {
        return Err(MemFrameError::frame_size_mismatch(layout.payload_size(), len));
    }
    Ok(())
}
