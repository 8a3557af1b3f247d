//! In-process stand-in for a foreign address space

use std::sync::RwLock;

use crate::error::{MemFrameError, Result};

use super::{maps::MemoryRange, process::ProcessMemory};

#[derive(Debug)]
struct Segment {
    range: MemoryRange,
    data: RwLock<Vec<u8>>,
}

/// A sparse memory image: a set of non-overlapping segments at fixed
/// addresses, readable and writable through [`ProcessMemory`]
///
/// Used to exercise discovery and remote producers without a second
/// process, and to analyse dumped memory offline. Accesses may span
/// adjacent segments but fail on any gap, like reads from a real process.
#[derive(Debug)]
pub struct MemoryImage {
    pid: i32,
    segments: Vec<Segment>,
}

impl MemoryImage {
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            segments: Vec::new(),
        }
    }

    /// Add a segment starting at `start`, rejecting overlaps
    pub fn add_segment(&mut self, start: u64, data: Vec<u8>, writable: bool) -> Result<()> {
        let end = start
            .checked_add(data.len() as u64)
            .ok_or_else(|| MemFrameError::invalid_parameter("start", "Segment wraps address space"))?;
        if data.is_empty() {
            return Err(MemFrameError::invalid_parameter("data", "Segment cannot be empty"));
        }
        if self
            .segments
            .iter()
            .any(|s| start < s.range.end && s.range.start < end)
        {
            return Err(MemFrameError::invalid_parameter(
                "start",
                format!("Segment {:#x}..{:#x} overlaps an existing segment", start, end),
            ));
        }

        let position = self
            .segments
            .iter()
            .position(|s| s.range.start > start)
            .unwrap_or(self.segments.len());
        self.segments.insert(
            position,
            Segment {
                range: MemoryRange::new(start, end, writable),
                data: RwLock::new(data),
            },
        );
        Ok(())
    }

    /// Builder form of [`MemoryImage::add_segment`]
    pub fn with_segment(mut self, start: u64, data: Vec<u8>, writable: bool) -> Result<Self> {
        self.add_segment(start, data, writable)?;
        Ok(self)
    }

    fn segment_at(&self, address: u64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.range.contains(address))
    }

    /// Walk `len` bytes from `address`, calling `f(segment, offset_in_segment, offset_in_access, n)`
    fn for_each_span<F>(&self, address: u64, len: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&Segment, usize, usize, usize) -> Result<()>,
    {
        let mut done = 0usize;
        while done < len {
            let current = address + done as u64;
            let segment = self.segment_at(current).ok_or_else(|| {
                MemFrameError::from_io(
                    std::io::Error::from(std::io::ErrorKind::InvalidInput),
                    &format!("Address {:#x} is not mapped", current),
                )
            })?;
            let offset = (current - segment.range.start) as usize;
            let n = (len - done).min(segment.range.len() as usize - offset);
            f(segment, offset, done, n)?;
            done += n;
        }
        Ok(())
    }
}

impl ProcessMemory for MemoryImage {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>> {
        Ok(self
            .segments
            .iter()
            .filter(|s| !writeable_only || s.range.writable)
            .map(|s| s.range.clone())
            .collect())
    }

    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.for_each_span(address, buf.len(), |segment, offset, at, n| {
            let data = segment
                .data
                .read()
                .map_err(|_| MemFrameError::platform("Image segment lock poisoned"))?;
            buf[at..at + n].copy_from_slice(&data[offset..offset + n]);
            Ok(())
        })
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.for_each_span(address, data.len(), |segment, offset, at, n| {
            let mut bytes = segment
                .data
                .write()
                .map_err(|_| MemFrameError::platform("Image segment lock poisoned"))?;
            bytes[offset..offset + n].copy_from_slice(&data[at..at + n]);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_within_segment() {
        let image = MemoryImage::new(7)
            .with_segment(0x1000, vec![0; 16], true)
            .unwrap();
        image.write_bytes(0x1004, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 4];
        image.read_bytes(0x1003, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3]);
    }

    #[test]
    fn test_access_spanning_adjacent_segments() {
        let image = MemoryImage::new(7)
            .with_segment(0x1000, vec![1; 8], true)
            .unwrap()
            .with_segment(0x1008, vec![2; 8], false)
            .unwrap();

        let mut buf = [0u8; 4];
        image.read_bytes(0x1006, &mut buf).unwrap();
        assert_eq!(buf, [1, 1, 2, 2]);
    }

    #[test]
    fn test_gap_and_overlap_rejected() {
        let mut image = MemoryImage::new(7);
        image.add_segment(0x1000, vec![0; 8], true).unwrap();
        image.add_segment(0x2000, vec![0; 8], true).unwrap();
        assert!(image.add_segment(0x1004, vec![0; 8], true).is_err());

        let mut buf = [0u8; 16];
        assert!(image.read_bytes(0x1000, &mut buf).is_err());
        assert!(image.read_bytes(0x3000, &mut buf[..1]).is_err());
    }

    #[test]
    fn test_mapped_ranges_sorted_and_filtered() {
        let image = MemoryImage::new(7)
            .with_segment(0x3000, vec![0; 8], true)
            .unwrap()
            .with_segment(0x1000, vec![0; 8], false)
            .unwrap();

        let all = image.mapped_ranges(false).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].start, 0x1000);
        assert_eq!(image.mapped_ranges(true).unwrap().len(), 1);
    }
}
