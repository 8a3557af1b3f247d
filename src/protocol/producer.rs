//! Writing side of the handshake

use log::trace;

use crate::{
    error::Result,
    ownership::Ownership,
    region_layout::RegionLayout,
};

use super::{access::{check_frame_len, RegionAccess}, stats::ProducerStats};

/// Result of one produce attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProduceOutcome {
    /// Frame written and handed to the consumer
    Written,
    /// Consumer has not taken the previous frame; this one was dropped
    Skipped,
}

impl ProduceOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Producer bound to one region
///
/// Holds no frame of its own: a frame offered while the consumer owns the
/// payload is dropped, never queued.
#[derive(Debug)]
pub struct Producer<R> {
    region: R,
    stats: ProducerStats,
}

impl<R: RegionAccess> Producer<R> {
    pub fn new(region: R) -> Self {
        Self {
            region,
            stats: ProducerStats::default(),
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        self.region.layout()
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn stats(&self) -> &ProducerStats {
        &self.stats
    }

    /// Write `frame` if the producer currently owns the payload
    ///
    /// On success the payload holds `frame` and the ownership byte reads
    /// consumer-owned. When the consumer owns the payload nothing is
    /// written and [`ProduceOutcome::Skipped`] is returned.
    ///
    /// Fails with `FrameSizeMismatch` if `frame` does not fill the payload,
    /// `InvalidOwnershipValue` if the flag holds a foreign value, and
    /// `LayoutCorrupt` if a marker does not match before or after the write.
    pub fn try_produce(&mut self, frame: &[u8]) -> Result<ProduceOutcome> {
        check_frame_len(self.region.layout(), frame.len())?;

        let state = self.region.ownership()?;
        match state {
            Ownership::ConsumerOwned => {
                self.stats.frames_skipped += 1;
                trace!("Consumer still owns the payload, dropping frame");
                return Ok(ProduceOutcome::Skipped);
            }
            Ownership::ProducerOwned => {}
        }

        self.region.verify_markers()?;
        self.region.write_payload(frame)?;
        self.region.verify_magic_end()?;
        // flag last: the payload must be complete before the consumer can see it
        self.region.store_ownership(state.handed_over())?;

        self.stats.frames_written += 1;
        trace!("Frame {} handed to consumer", self.stats.frames_written);
        Ok(ProduceOutcome::Written)
    }

    pub fn into_region(self) -> R {
        self.region
    }
}
