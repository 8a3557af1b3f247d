//! Fixed-cadence tick scheduling and loop termination

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::error::{MemFrameError, Result};

/// Default cadence, one tick per 60 Hz display refresh
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

/// Cadence and termination of a poll loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Stop after this many ticks; run until stopped when `None`
    pub max_ticks: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / DEFAULT_REFRESH_HZ),
            max_ticks: None,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_ticks: None,
        }
    }

    /// Cadence given as ticks per second
    pub fn from_hz(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(MemFrameError::invalid_parameter(
                "hz",
                "Tick rate must be a positive number",
            ));
        }
        Ok(Self::new(Duration::from_secs_f64(1.0 / hz)))
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(MemFrameError::invalid_parameter(
                "interval",
                "Tick interval must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Whether `ticks` completed ticks exhaust the budget
    pub(crate) fn is_exhausted(&self, ticks: u64) -> bool {
        self.max_ticks.map_or(false, |max| ticks >= max)
    }
}

/// Cloneable flag that ends a running loop at its next tick
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Deadline tracker for a fixed cadence
///
/// Deadlines are `start + n * interval`, so sleeping jitter does not
/// accumulate. When the caller falls more than a whole interval behind,
/// the missed deadlines are dropped rather than fired back to back.
#[derive(Debug)]
pub struct TickSchedule {
    interval: Duration,
    next: Instant,
}

impl TickSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Sleep until the next deadline; returns how many deadlines were skipped
    pub fn wait_next(&mut self) -> u64 {
        if self.interval.is_zero() {
            return 0;
        }

        self.next += self.interval;
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
            return 0;
        }

        let behind = now - self.next;
        let missed = (behind.as_nanos() / self.interval.as_nanos()) as u64;
        if missed > 0 {
            self.next += self.interval * missed.min(u32::MAX as u64) as u32;
        }
        missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_config() {
        let config = PollConfig::from_hz(100.0).unwrap();
        assert_eq!(config.interval, Duration::from_millis(10));
        assert!(config.validate().is_ok());
        assert!(PollConfig::from_hz(0.0).is_err());
        assert!(PollConfig::from_hz(f64::NAN).is_err());
        assert!(PollConfig::new(Duration::ZERO).validate().is_err());

        let bounded = config.with_max_ticks(3);
        assert!(!bounded.is_exhausted(2));
        assert!(bounded.is_exhausted(3));
        assert!(!PollConfig::default().is_exhausted(u64::MAX));
    }

    #[test]
    fn test_stop_handle_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());
        clone.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_schedule_waits_interval() {
        let mut schedule = TickSchedule::new(Duration::from_millis(5));
        let start = Instant::now();
        schedule.wait_next();
        schedule.wait_next();
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_schedule_drops_missed_deadlines() {
        let mut schedule = TickSchedule::new(Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(20));
        assert!(schedule.wait_next() > 0);
        // caught up again: the next wait sleeps instead of firing immediately
        let start = Instant::now();
        assert_eq!(schedule.wait_next(), 0);
        assert!(start.elapsed() > Duration::ZERO);
    }
}
