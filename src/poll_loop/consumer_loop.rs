//! Refresh-driven consumer loop

use std::time::{Duration, Instant};

use log::info;

use crate::{
    error::Result,
    protocol::{Consumer, Frame, RegionAccess},
};

use super::schedule::{PollConfig, StopHandle, TickSchedule};

/// Receives each consumed frame, e.g. a raster surface doing a full-frame replace
pub trait FrameSink {
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame) -> Result<()>,
{
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self(frame)
    }
}

/// What a finished loop did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Ticks executed
    pub ticks: u64,
    /// Ticks that took a frame
    pub frames: u64,
    /// Deadlines dropped because a tick overran
    pub missed_ticks: u64,
    /// Ticks since the last frame at the moment the loop ended
    pub ticks_since_last_frame: u64,
    pub elapsed: Duration,
}

/// Cooperative scheduler calling [`Consumer::try_consume`] once per tick
///
/// A host that already has a refresh callback calls [`PollLoop::tick`]
/// from it; otherwise [`PollLoop::run`] keeps its own cadence until the
/// tick budget runs out or the [`StopHandle`] fires. Handshake errors end
/// the loop.
#[derive(Debug)]
pub struct PollLoop {
    config: PollConfig,
    stop: StopHandle,
}

impl PollLoop {
    pub fn new(config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopHandle::new(),
        })
    }

    /// Use an existing stop flag
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// One check-and-copy step; returns whether a frame was presented
    pub fn tick<R, S>(&self, consumer: &mut Consumer<R>, sink: &mut S) -> Result<bool>
    where
        R: RegionAccess,
        S: FrameSink + ?Sized,
    {
        match consumer.try_consume()? {
            Some(frame) => {
                sink.present(&frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tick at the configured cadence until stopped or out of ticks
    pub fn run<R, S>(&self, consumer: &mut Consumer<R>, sink: &mut S) -> Result<LoopSummary>
    where
        R: RegionAccess,
        S: FrameSink + ?Sized,
    {
        let started = Instant::now();
        let mut schedule = TickSchedule::new(self.config.interval);
        let mut summary = LoopSummary::default();

        while !self.stop.is_stopped() && !self.config.is_exhausted(summary.ticks) {
            if self.tick(consumer, sink)? {
                summary.frames += 1;
                summary.ticks_since_last_frame = 0;
            } else {
                summary.ticks_since_last_frame += 1;
            }
            summary.ticks += 1;

            if self.config.is_exhausted(summary.ticks) {
                break;
            }
            summary.missed_ticks += schedule.wait_next();
        }

        summary.elapsed = started.elapsed();
        info!(
            "Consumer loop ended after {} ticks: {} frames, {} missed deadlines",
            summary.ticks, summary.frames, summary.missed_ticks
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{RegionConfig, SharedRegion},
        ownership::Ownership,
        region_layout::PAYLOAD_OFFSET,
    };

    #[test]
    fn test_tick_presents_pending_frame() {
        let region = SharedRegion::create(RegionConfig::new("tick", 1, 1)).unwrap();
        let poll = PollLoop::new(PollConfig::from_hz(1000.0).unwrap()).unwrap();
        let mut consumer = Consumer::new(&region);
        let mut seen = Vec::new();
        let mut sink = |frame: &Frame| -> Result<()> {
            seen.push(frame.as_bytes().to_vec());
            Ok(())
        };

        assert!(!poll.tick(&mut consumer, &mut sink).unwrap());

        region.write_at(PAYLOAD_OFFSET, &[1, 2, 3, 4]).unwrap();
        region.set_ownership(Ownership::ConsumerOwned);
        assert!(poll.tick(&mut consumer, &mut sink).unwrap());
        assert!(!poll.tick(&mut consumer, &mut sink).unwrap());

        drop(sink);
        assert_eq!(seen, vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn test_run_honours_tick_budget() {
        let region = SharedRegion::create(RegionConfig::new("budget", 1, 1)).unwrap();
        let poll = PollLoop::new(PollConfig::from_hz(1000.0).unwrap().with_max_ticks(5)).unwrap();
        let mut consumer = Consumer::new(&region);
        let mut sink = |_: &Frame| -> Result<()> { Ok(()) };

        let summary = poll.run(&mut consumer, &mut sink).unwrap();
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.ticks_since_last_frame, 5);
    }

    #[test]
    fn test_stopped_loop_does_not_tick() {
        let region = SharedRegion::create(RegionConfig::new("stopped", 1, 1)).unwrap();
        let poll = PollLoop::new(PollConfig::default()).unwrap();
        poll.stop_handle().stop();

        let mut consumer = Consumer::new(&region);
        let mut sink = |_: &Frame| -> Result<()> { Ok(()) };
        let summary = poll.run(&mut consumer, &mut sink).unwrap();
        assert_eq!(summary.ticks, 0);
    }

    #[test]
    fn test_run_stops_on_protocol_violation() {
        let region = SharedRegion::create(RegionConfig::new("violation", 1, 1)).unwrap();
        region.write_at(4, &[64]).unwrap();
        let poll = PollLoop::new(PollConfig::from_hz(1000.0).unwrap()).unwrap();
        let mut consumer = Consumer::new(&region);
        let mut sink = |_: &Frame| -> Result<()> { Ok(()) };

        let err = poll.run(&mut consumer, &mut sink).unwrap_err();
        assert!(err.is_protocol_violation());
    }
}
