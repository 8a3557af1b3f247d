//! Tick-driven loops around the producer and consumer
//!
//! Both sides poll: the consumer once per display refresh, the producer at
//! its own frame rate. Neither loop blocks on the other; a tick that finds
//! the peer still owning the payload just does nothing.

pub mod consumer_loop;
pub mod producer_loop;
pub mod schedule;

pub use consumer_loop::{FrameSink, LoopSummary, PollLoop};
pub use producer_loop::{FrameSource, ProducerLoop, ProducerSummary, TestPattern};
pub use schedule::{PollConfig, StopHandle, TickSchedule, DEFAULT_REFRESH_HZ};
