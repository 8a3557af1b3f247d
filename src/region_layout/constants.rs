//! Constants for the shared frame region layout

/// Marker at offset 0 of every region
pub const MAGIC_START: u32 = 1_234_567_890;

/// Marker immediately after the payload
pub const MAGIC_END: u32 = 987_654_321;

/// Width of each magic marker in bytes
pub const MAGIC_SIZE: usize = 4;

/// Offset of the ownership byte
pub const OWNERSHIP_OFFSET: usize = 4;

/// Offset of the reserved padding bytes
pub const RESERVED_OFFSET: usize = 5;

/// Number of reserved bytes between the ownership byte and the payload
pub const RESERVED_SIZE: usize = 3;

/// Offset of the first payload byte (header length)
pub const PAYLOAD_OFFSET: usize = 8;

/// Fixed bytes outside the payload: header plus trailing marker
pub const REGION_OVERHEAD: usize = PAYLOAD_OFFSET + MAGIC_SIZE;

/// Packed pixel size
pub const BYTES_PER_PIXEL: usize = 4;

/// Width of the reference instance
pub const DEFAULT_WIDTH: u32 = 640;

/// Height of the reference instance
pub const DEFAULT_HEIGHT: u32 = 480;
