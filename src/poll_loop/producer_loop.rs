//! Fixed-cadence producer loop

use std::time::{Duration, Instant};

use log::info;

use crate::{
    error::Result,
    protocol::{Frame, ProduceOutcome, Producer, RegionAccess},
    region_layout::RegionLayout,
};

use super::schedule::{PollConfig, StopHandle, TickSchedule};

/// Supplies the frame to offer on each tick; `None` ends the loop
pub trait FrameSource {
    fn next_frame(&mut self, tick: u64) -> Option<Frame>;
}

impl<F> FrameSource for F
where
    F: FnMut(u64) -> Option<Frame>,
{
    fn next_frame(&mut self, tick: u64) -> Option<Frame> {
        self(tick)
    }
}

/// What a finished producer loop did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerSummary {
    pub ticks: u64,
    pub written: u64,
    /// Frames dropped because the consumer had not taken the previous one
    pub skipped: u64,
    pub missed_ticks: u64,
    pub elapsed: Duration,
}

/// Offers one frame per tick; a frame the consumer is not ready for is dropped
#[derive(Debug)]
pub struct ProducerLoop {
    config: PollConfig,
    stop: StopHandle,
}

impl ProducerLoop {
    pub fn new(config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopHandle::new(),
        })
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until stopped, out of ticks, or the source is exhausted
    pub fn run<R, S>(&self, producer: &mut Producer<R>, source: &mut S) -> Result<ProducerSummary>
    where
        R: RegionAccess,
        S: FrameSource + ?Sized,
    {
        let started = Instant::now();
        let mut schedule = TickSchedule::new(self.config.interval);
        let mut summary = ProducerSummary::default();

        while !self.stop.is_stopped() && !self.config.is_exhausted(summary.ticks) {
            let Some(frame) = source.next_frame(summary.ticks) else {
                break;
            };
            match producer.try_produce(frame.as_bytes())? {
                ProduceOutcome::Written => summary.written += 1,
                ProduceOutcome::Skipped => summary.skipped += 1,
            }
            summary.ticks += 1;

            if self.config.is_exhausted(summary.ticks) {
                break;
            }
            summary.missed_ticks += schedule.wait_next();
        }

        summary.elapsed = started.elapsed();
        info!(
            "Producer loop ended after {} ticks: {} written, {} skipped",
            summary.ticks, summary.written, summary.skipped
        );
        Ok(summary)
    }
}

/// Animated test image: a bright square circling over a gray background
/// that slowly fades previous positions
#[derive(Debug, Clone)]
pub struct TestPattern {
    layout: RegionLayout,
    canvas: Frame,
    /// Angular speed in radians per tick
    speed: f64,
}

impl TestPattern {
    const BACKGROUND: u8 = 129;
    const SQUARE: [u8; 4] = [255, 0, 0, 255];

    pub fn new(layout: RegionLayout) -> Self {
        Self {
            layout,
            canvas: Frame::filled(&layout, [Self::BACKGROUND; 4]),
            speed: 0.05,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    fn render(&mut self, tick: u64) {
        // blend 10% toward the background each frame
        for byte in self.canvas.as_bytes_mut() {
            *byte = ((*byte as u16 * 9 + Self::BACKGROUND as u16) / 10) as u8;
        }

        let (w, h) = (self.layout.width() as f64, self.layout.height() as f64);
        let angle = tick as f64 * self.speed;
        let radius = w.min(h) / 4.0;
        let cx = w / 2.0 + angle.cos() * radius;
        let cy = h / 2.0 + angle.sin() * radius;
        let half = (w.min(h) / 16.0).max(1.0);

        let x0 = (cx - half).max(0.0) as u32;
        let y0 = (cy - half).max(0.0) as u32;
        let x1 = ((cx + half) as u32).min(self.layout.width());
        let y1 = ((cy + half) as u32).min(self.layout.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.canvas.set_pixel(x, y, Self::SQUARE);
            }
        }
    }
}

impl FrameSource for TestPattern {
    fn next_frame(&mut self, tick: u64) -> Option<Frame> {
        self.render(tick);
        Some(self.canvas.clone())
    }
}
