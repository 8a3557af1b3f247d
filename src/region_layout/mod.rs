//! Byte layout of the shared frame region
//!
//! ```text
//! offset 0        4     5          8                    8+payload
//! ┌───────────────┬─────┬──────────┬────────────────────┬─────────────┐
//! │ MagicStart u32│ own │ reserved │ payload (w*h*4)    │ MagicEnd u32│
//! └───────────────┴─────┴──────────┴────────────────────┴─────────────┘
//! ```
//!
//! Both markers are little-endian. The layout has no behavior of its own
//! beyond size arithmetic and marker encoding.

pub mod constants;
pub mod layout;

pub use constants::*;
pub use layout::{decode_u32, encode_u32, RegionLayout};
