//! Producer and consumer halves of the single-slot handoff
//!
//! ```text
//!   producer                    region                    consumer
//!   ────────                    ──────                    ────────
//!   flag == 0 ? ──────────────▶ [own=0]
//!   write payload ────────────▶ [payload]
//!   check MagicEnd
//!   flag = 128 ───────────────▶ [own=128] ◀────────────── flag == 128 ?
//!                               [payload] ──────────────▶ copy out
//!                               [own=0]   ◀────────────── flag = 0
//! ```
//!
//! One slot, no queue: a frame offered while the consumer owns the payload
//! is dropped. A poll that finds the other side still owning the payload is
//! a normal skip, not an error.

pub mod access;
pub mod consumer;
pub mod frame;
pub mod producer;
pub mod stats;

pub use access::RegionAccess;
pub use consumer::Consumer;
pub use frame::Frame;
pub use producer::{ProduceOutcome, Producer};
pub use stats::{ConsumerStats, ProducerStats};
