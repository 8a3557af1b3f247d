//! # memframe - Frame Handoff Through Foreign Process Memory
//!
//! memframe moves image frames from a producer process into a fixed-size
//! region that lives inside a second, unrelated process. No socket, pipe or
//! shared-memory object connects the two: the producer finds the region by
//! scanning the target's memory for two magic markers, then writes frames
//! directly into it. A single ownership byte inside the region decides
//! which side may touch the payload.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐              ┌──────────────────────────┐
//! │     producer process     │              │     consumer process     │
//! │                          │   scan/read  │                          │
//! │  discovery ──────────────┼─────────────▶│  SharedRegion            │
//! │  Producer<RemoteRegion>  │    write     │  [magic|own|rsv|pixels|  │
//! │  ProducerLoop ───────────┼─────────────▶│   magic]                 │
//! │                          │              │  Consumer<SharedRegion>  │
//! │                          │              │  PollLoop ──▶ FrameSink  │
//! └──────────────────────────┘              └──────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`region_layout`]: offsets, sizes and marker encoding
//! - [`ownership`]: the two-state handshake byte
//! - [`memory`]: regions allocated in our own address space
//! - [`remote`]: foreign memory capability, range maps, remote regions
//! - [`discovery`]: locating a region by its markers
//! - [`protocol`]: producer and consumer halves of the handoff
//! - [`poll_loop`]: tick-driven loops around both halves

// Core modules
pub mod error;
pub mod ownership;
pub mod region_layout;

// Regions and memory access
pub mod memory;
pub mod remote;
pub mod discovery;

// Handoff and scheduling
pub mod protocol;
pub mod poll_loop;

// Main API re-exports
pub use error::{MemFrameError, Result};
pub use ownership::Ownership;
pub use region_layout::RegionLayout;
pub use memory::{BackingType, RegionConfig, SharedRegion};
pub use remote::{MemoryImage, MemoryRange, ProcessMemory, RemoteHandle, RemoteRegion};
#[cfg(target_os = "linux")]
pub use remote::{AccessMethod, ProcMemory};
pub use discovery::{discover, narrow, revalidate, scan, ScanOptions, ScanReport};
pub use protocol::{
    Consumer, ConsumerStats, Frame, ProduceOutcome, Producer, ProducerStats, RegionAccess,
};
pub use poll_loop::{
    FrameSink, FrameSource, LoopSummary, PollConfig, PollLoop, ProducerLoop, ProducerSummary,
    StopHandle, TestPattern,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
