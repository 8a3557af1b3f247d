//! Size arithmetic and marker encoding for a given frame size

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{MemFrameError, Result};
use crate::ownership::Ownership;

use super::constants::*;

/// Encode a marker value as its canonical 4-byte little-endian sequence
pub fn encode_u32(value: u32) -> [u8; MAGIC_SIZE] {
    value.to_le_bytes()
}

/// Decode a 4-byte little-endian sequence
pub fn decode_u32(bytes: [u8; MAGIC_SIZE]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Layout of one region for an agreed (width, height)
///
/// Deserializing goes through [`RegionLayout::new`]; a stored
/// `payload_size` must agree with the dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LayoutDims", into = "LayoutDims")]
pub struct RegionLayout {
    width: u32,
    height: u32,
    payload_size: usize,
}

impl RegionLayout {
    /// Create a layout, rejecting zero dimensions and sizes that overflow
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 {
            return Err(MemFrameError::invalid_parameter(
                "width",
                "Width must be greater than 0",
            ));
        }
        if height == 0 {
            return Err(MemFrameError::invalid_parameter(
                "height",
                "Height must be greater than 0",
            ));
        }

        let payload_size = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .filter(|size| size.checked_add(REGION_OVERHEAD).is_some())
            .ok_or_else(|| {
                MemFrameError::invalid_parameter("dimensions", "Frame size overflows usize")
            })?;

        Ok(Self {
            width,
            height,
            payload_size,
        })
    }

    /// The 640x480 reference layout
    pub fn reference() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            payload_size: DEFAULT_WIDTH as usize * DEFAULT_HEIGHT as usize * BYTES_PER_PIXEL,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in one row of pixels
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Size of the pixel payload in bytes
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Offset of the trailing marker, relative to the region base
    pub fn magic_end_offset(&self) -> usize {
        PAYLOAD_OFFSET + self.payload_size
    }

    /// Total region length: 12 + width*height*4
    pub fn total_size(&self) -> usize {
        self.magic_end_offset() + MAGIC_SIZE
    }

    /// Byte range of the payload within the region
    pub fn payload_range(&self) -> Range<usize> {
        PAYLOAD_OFFSET..self.magic_end_offset()
    }

    /// Canonical encoding of the start marker
    pub fn magic_start_bytes() -> [u8; MAGIC_SIZE] {
        encode_u32(MAGIC_START)
    }

    /// Canonical encoding of the end marker
    pub fn magic_end_bytes() -> [u8; MAGIC_SIZE] {
        encode_u32(MAGIC_END)
    }

    /// Write markers, reserved bytes and the initial ownership value
    /// into a buffer of exactly `total_size()` bytes. The payload is
    /// left untouched.
    pub fn initialize(&self, region: &mut [u8]) -> Result<()> {
        self.check_len(region.len())?;

        region[..MAGIC_SIZE].copy_from_slice(&Self::magic_start_bytes());
        region[OWNERSHIP_OFFSET] = Ownership::ProducerOwned.as_byte();
        region[RESERVED_OFFSET..PAYLOAD_OFFSET].fill(0);

        let end = self.magic_end_offset();
        region[end..end + MAGIC_SIZE].copy_from_slice(&Self::magic_end_bytes());
        Ok(())
    }

    /// Verify both markers of a region image
    pub fn verify_markers(&self, region: &[u8]) -> Result<()> {
        self.check_len(region.len())?;

        if region[..MAGIC_SIZE] != Self::magic_start_bytes() {
            return Err(MemFrameError::layout_corrupt("magic_start", 0));
        }
        self.verify_magic_end(region)
    }

    /// Verify only the trailing marker; used after every payload write
    pub fn verify_magic_end(&self, region: &[u8]) -> Result<()> {
        let end = self.magic_end_offset();
        match region.get(end..end + MAGIC_SIZE) {
            Some(bytes) if bytes == Self::magic_end_bytes() => Ok(()),
            _ => Err(MemFrameError::layout_corrupt("magic_end", end)),
        }
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.total_size() {
            return Err(MemFrameError::invalid_parameter(
                "region",
                format!(
                    "Region length {} does not match layout size {}",
                    len,
                    self.total_size()
                ),
            ));
        }
        Ok(())
    }
}

/// Serialized form of a [`RegionLayout`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayoutDims {
    width: u32,
    height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_size: Option<usize>,
}

impl TryFrom<LayoutDims> for RegionLayout {
    type Error = MemFrameError;

    fn try_from(dims: LayoutDims) -> Result<Self> {
        let layout = Self::new(dims.width, dims.height)?;
        match dims.payload_size {
            Some(size) if size != layout.payload_size => Err(MemFrameError::invalid_parameter(
                "payload_size",
                format!(
                    "Payload size {} does not match {}x{} (expected {})",
                    size, dims.width, dims.height, layout.payload_size
                ),
            )),
            _ => Ok(layout),
        }
    }
}

impl From<RegionLayout> for LayoutDims {
    fn from(layout: RegionLayout) -> Self {
        Self {
            width: layout.width,
            height: layout.height,
            payload_size: Some(layout.payload_size),
        }
    }
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sizes() {
        let layout = RegionLayout::reference();
        assert_eq!(layout.payload_size(), 1_228_800);
        assert_eq!(layout.total_size(), 1_228_812);
        assert_eq!(layout.magic_end_offset(), 1_228_808);
        assert_eq!(layout, RegionLayout::new(640, 480).unwrap());
    }

    #[test]
    fn test_total_size_formula() {
        for (w, h) in [(1, 1), (2, 1), (3, 7), (17, 31), (1920, 1080)] {
            let layout = RegionLayout::new(w, h).unwrap();
            assert_eq!(layout.total_size(), 12 + w as usize * h as usize * 4);
        }
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            RegionLayout::new(0, 10),
            Err(MemFrameError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RegionLayout::new(10, 0),
            Err(MemFrameError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_marker_encoding() {
        assert_eq!(RegionLayout::magic_start_bytes(), [0xD2, 0x02, 0x96, 0x49]);
        assert_eq!(RegionLayout::magic_end_bytes(), [0xB1, 0x68, 0xDE, 0x3A]);
        assert_eq!(decode_u32(encode_u32(MAGIC_END)), MAGIC_END);
    }

    #[test]
    fn test_initialize_and_verify() {
        let layout = RegionLayout::new(2, 1).unwrap();
        let mut buf = vec![0xFFu8; layout.total_size()];
        layout.initialize(&mut buf).unwrap();

        assert_eq!(buf[OWNERSHIP_OFFSET], 0);
        assert_eq!(&buf[RESERVED_OFFSET..PAYLOAD_OFFSET], &[0, 0, 0]);
        // payload untouched
        assert!(buf[layout.payload_range()].iter().all(|&b| b == 0xFF));
        layout.verify_markers(&buf).unwrap();

        buf[layout.magic_end_offset()] ^= 1;
        assert!(matches!(
            layout.verify_markers(&buf),
            Err(MemFrameError::LayoutCorrupt { field: "magic_end", offset: 16 })
        ));
    }

    #[test]
    fn test_deserialize_validates_dimensions() {
        let layout: RegionLayout = serde_json::from_str(r#"{"width":2,"height":1}"#).unwrap();
        assert_eq!(layout.total_size(), 20);

        let json = serde_json::to_string(&layout).unwrap();
        assert_eq!(serde_json::from_str::<RegionLayout>(&json).unwrap(), layout);

        assert!(serde_json::from_str::<RegionLayout>(
            r#"{"width":0,"height":0,"payload_size":0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<RegionLayout>(
            r#"{"width":2,"height":1,"payload_size":4}"#
        )
        .is_err());
    }

    #[test]
    fn test_initialize_wrong_length() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let mut buf = vec![0u8; layout.total_size() - 1];
        assert!(layout.initialize(&mut buf).is_err());
    }
}
