//! Reading side of the handshake

use log::trace;

use crate::{
    error::Result,
    ownership::Ownership,
    region_layout::RegionLayout,
};

use super::{
    access::{check_frame_len, RegionAccess},
    frame::Frame,
    stats::ConsumerStats,
};

/// Consumer bound to one region
///
/// Keeps a private copy of the last frame it took, so the payload can be
/// handed back to the producer immediately after the copy.
#[derive(Debug)]
pub struct Consumer<R> {
    region: R,
    buffer: Vec<u8>,
    stats: ConsumerStats,
}

impl<R: RegionAccess> Consumer<R> {
    pub fn new(region: R) -> Self {
        let buffer = vec![0u8; region.layout().payload_size()];
        Self {
            region,
            buffer,
            stats: ConsumerStats::default(),
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        self.region.layout()
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Bytes of the last frame taken (zeroes before the first one)
    pub fn last_frame(&self) -> &[u8] {
        &self.buffer
    }

    /// Take the pending frame, if the producer has handed one over
    ///
    /// On success exactly one payload read and one ownership flip back to
    /// the producer have happened. Returns `None` without side effects when
    /// the producer still owns the payload.
    pub fn try_consume(&mut self) -> Result<Option<Frame>> {
        if !self.consume_into_buffer()? {
            return Ok(None);
        }
        Frame::new(self.region.layout(), self.buffer.clone()).map(Some)
    }

    /// Like [`Consumer::try_consume`] but copies into a caller buffer of
    /// exactly `payload_size()` bytes; returns whether a frame was taken
    pub fn try_consume_into(&mut self, out: &mut [u8]) -> Result<bool> {
        check_frame_len(self.region.layout(), out.len())?;
        if !self.consume_into_buffer()? {
            return Ok(false);
        }
        out.copy_from_slice(&self.buffer);
        Ok(true)
    }

    fn consume_into_buffer(&mut self) -> Result<bool> {
        let state = self.region.ownership()?;
        match state {
            Ownership::ProducerOwned => {
                self.stats.empty_polls += 1;
                return Ok(false);
            }
            Ownership::ConsumerOwned => {}
        }

        self.region.verify_markers()?;
        self.region.read_payload(&mut self.buffer)?;
        self.region.store_ownership(state.handed_over())?;

        self.stats.frames_consumed += 1;
        trace!("Frame {} taken, payload returned to producer", self.stats.frames_consumed);
        Ok(true)
    }

    pub fn into_region(self) -> R {
        self.region
    }
}
