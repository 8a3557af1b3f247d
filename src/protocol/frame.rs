//! Owned frame buffers

use crate::{
    error::{MemFrameError, Result},
    region_layout::{RegionLayout, BYTES_PER_PIXEL},
};

/// One packed 4-bytes-per-pixel image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap pixel bytes, which must fill the layout's payload exactly
    pub fn new(layout: &RegionLayout, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != layout.payload_size() {
            return Err(MemFrameError::frame_size_mismatch(
                layout.payload_size(),
                pixels.len(),
            ));
        }
        Ok(Self {
            width: layout.width(),
            height: layout.height(),
            pixels,
        })
    }

    /// Frame with every pixel set to `pixel`
    pub fn filled(layout: &RegionLayout, pixel: [u8; BYTES_PER_PIXEL]) -> Self {
        let pixels = pixel
            .iter()
            .copied()
            .cycle()
            .take(layout.payload_size())
            .collect();
        Self {
            width: layout.width(),
            height: layout.height(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at (x, y), if inside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; BYTES_PER_PIXEL]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut px = [0u8; BYTES_PER_PIXEL];
        px.copy_from_slice(&self.pixels[at..at + BYTES_PER_PIXEL]);
        Some(px)
    }

    /// Set the pixel at (x, y); out-of-frame coordinates are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [u8; BYTES_PER_PIXEL]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let at = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        self.pixels[at..at + BYTES_PER_PIXEL].copy_from_slice(&value);
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_size() {
        let layout = RegionLayout::new(2, 1).unwrap();
        assert!(Frame::new(&layout, vec![0; 8]).is_ok());
        assert!(matches!(
            Frame::new(&layout, vec![0; 7]),
            Err(MemFrameError::FrameSizeMismatch { expected: 8, actual: 7 })
        ));
    }

    #[test]
    fn test_pixels() {
        let layout = RegionLayout::new(3, 2).unwrap();
        let mut frame = Frame::filled(&layout, [1, 2, 3, 4]);
        assert_eq!(frame.as_bytes().len(), 24);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 4]));

        frame.set_pixel(1, 1, [9, 9, 9, 9]);
        assert_eq!(frame.pixel(1, 1), Some([9, 9, 9, 9]));
        assert_eq!(&frame.as_bytes()[16..20], &[9, 9, 9, 9]);
        assert_eq!(frame.pixel(3, 0), None);
    }
}
