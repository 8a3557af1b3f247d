//! Frame regions owned by this process

pub mod config;
pub mod region;

pub use config::{BackingType, RegionConfig};
pub use region::SharedRegion;
