//! Foreign process memory: handles, range maps and access capabilities

pub mod handle;
pub mod image;
pub mod maps;
pub mod process;
pub mod region;

pub use handle::RemoteHandle;
pub use image::MemoryImage;
pub use maps::{parse_maps, parse_maps_line, MemoryRange};
pub use process::ProcessMemory;
#[cfg(target_os = "linux")]
pub use process::{AccessMethod, ProcMemory};
pub use region::RemoteRegion;
