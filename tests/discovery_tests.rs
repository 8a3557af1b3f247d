//! Tests for marker discovery over in-process memory images

#[cfg(test)]
mod tests {
    use memframe::{
        discovery::{self, ScanOptions},
        protocol::{Consumer, Producer},
        region_layout::{RegionLayout, OWNERSHIP_OFFSET},
        remote::{MemoryImage, MemoryRange, ProcessMemory, RemoteRegion},
        MemFrameError, Ownership, Result,
    };
    use std::sync::Arc;

    const PID: i32 = 4242;

    fn region_bytes(layout: &RegionLayout) -> Vec<u8> {
        let mut bytes = vec![0u8; layout.total_size()];
        layout.initialize(&mut bytes).unwrap();
        bytes
    }

    /// A segment of `len` filler bytes with a region written at each of `offsets`
    fn segment_with_regions(layout: &RegionLayout, len: usize, offsets: &[usize]) -> Vec<u8> {
        let mut data = vec![0x11u8; len];
        let region = region_bytes(layout);
        for &offset in offsets {
            data[offset..offset + region.len()].copy_from_slice(&region);
        }
        data
    }

    /// Wraps an image and reports one extra range that cannot be read
    struct WithHole {
        image: MemoryImage,
        hole: MemoryRange,
    }

    impl ProcessMemory for WithHole {
        fn pid(&self) -> i32 {
            self.image.pid()
        }

        fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>> {
            let mut ranges = self.image.mapped_ranges(writeable_only)?;
            ranges.push(self.hole.clone());
            ranges.sort_by_key(|r| r.start);
            Ok(ranges)
        }

        fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
            self.image.read_bytes(address, buf)
        }

        fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
            self.image.write_bytes(address, data)
        }
    }

    #[test]
    fn test_single_region_found() {
        let layout = RegionLayout::new(4, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x10000, segment_with_regions(&layout, 4096, &[100]), true)
            .unwrap();

        let handle = discovery::discover(&image, &layout, &ScanOptions::new()).unwrap();
        assert_eq!(handle.pid, PID);
        assert_eq!(handle.base_address, 0x10000 + 100);
        assert_eq!(handle.length, layout.total_size());
    }

    #[test]
    fn test_no_region_is_not_found() {
        let layout = RegionLayout::new(4, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x10000, vec![0u8; 2048], true)
            .unwrap()
            .with_segment(0x20000, vec![0xFFu8; 2048], true)
            .unwrap();

        let err = discovery::discover(&image, &layout, &ScanOptions::new()).unwrap_err();
        assert!(matches!(err, MemFrameError::DiscoveryNotFound { ranges_scanned: 2 }));
    }

    #[test]
    fn test_two_regions_are_ambiguous() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x1000, segment_with_regions(&layout, 1024, &[0, 512]), true)
            .unwrap();

        match discovery::discover(&image, &layout, &ScanOptions::new()) {
            Err(MemFrameError::DiscoveryAmbiguous { candidates }) => {
                assert_eq!(candidates, vec![0x1000, 0x1000 + 512]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_start_marker_without_end_marker_ignored() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let mut data = segment_with_regions(&layout, 1024, &[64]);
        // a stray start marker followed by garbage
        data[600..604].copy_from_slice(&RegionLayout::magic_start_bytes());
        let image = MemoryImage::new(PID).with_segment(0x4000, data, true).unwrap();

        let report = discovery::scan(&image, &layout, &ScanOptions::new()).unwrap();
        assert_eq!(report.start_hits, 2);
        assert_eq!(report.candidates, vec![0x4000 + 64]);
    }

    #[test]
    fn test_marker_straddling_chunks_found() {
        let layout = RegionLayout::new(1, 1).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x8000, segment_with_regions(&layout, 256, &[30]), true)
            .unwrap();

        // the first chunk ends at 32, splitting the marker at 30..34
        let options = ScanOptions::new().with_chunk_size(32);
        let handle = discovery::discover(&image, &layout, &options).unwrap();
        assert_eq!(handle.base_address, 0x8000 + 30);
    }

    #[test]
    fn test_region_spanning_adjacent_segments() {
        let layout = RegionLayout::new(4, 4).unwrap();
        let region = region_bytes(&layout);
        let (head, tail) = region.split_at(20);

        let image = MemoryImage::new(PID)
            .with_segment(0x1000 - head.len() as u64, head.to_vec(), true)
            .unwrap()
            .with_segment(0x1000, tail.to_vec(), true)
            .unwrap();

        let handle = discovery::discover(&image, &layout, &ScanOptions::new()).unwrap();
        assert_eq!(handle.base_address, 0x1000 - head.len() as u64);
    }

    #[test]
    fn test_read_only_ranges_skipped_by_default() {
        let layout = RegionLayout::new(2, 1).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x2000, segment_with_regions(&layout, 512, &[16]), false)
            .unwrap();

        assert!(matches!(
            discovery::discover(&image, &layout, &ScanOptions::new()),
            Err(MemFrameError::DiscoveryNotFound { .. })
        ));

        let options = ScanOptions::new().with_writeable_only(false);
        let handle = discovery::discover(&image, &layout, &options).unwrap();
        assert_eq!(handle.base_address, 0x2000 + 16);
    }

    #[test]
    fn test_address_window_restricts_scan() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x1000, segment_with_regions(&layout, 1024, &[0, 512]), true)
            .unwrap();

        let options = ScanOptions::new().within(0x1000 + 500, 0x1000 + 1024);
        let handle = discovery::discover(&image, &layout, &options).unwrap();
        assert_eq!(handle.base_address, 0x1000 + 512);
    }

    #[test]
    fn test_unreadable_range_skipped() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let memory = WithHole {
            image: MemoryImage::new(PID)
                .with_segment(0x10000, segment_with_regions(&layout, 512, &[8]), true)
                .unwrap(),
            hole: MemoryRange::new(0x5000, 0x6000, true),
        };

        let report = discovery::scan(&memory, &layout, &ScanOptions::new()).unwrap();
        assert_eq!(report.ranges_skipped, 1);
        assert_eq!(report.ranges_scanned, 1);
        assert_eq!(report.candidates, vec![0x10000 + 8]);
    }

    #[test]
    fn test_narrow_by_ownership_byte() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x1000, segment_with_regions(&layout, 1024, &[0, 512]), true)
            .unwrap();

        let candidates = match discovery::discover(&image, &layout, &ScanOptions::new()) {
            Err(MemFrameError::DiscoveryAmbiguous { candidates }) => candidates,
            other => panic!("expected ambiguity, got {:?}", other),
        };

        // the real region's owner marks it
        image
            .write_bytes(0x1000 + 512 + OWNERSHIP_OFFSET as u64, &[Ownership::ConsumerOwned.as_byte()])
            .unwrap();

        let narrowed = discovery::narrow(&image, &candidates, OWNERSHIP_OFFSET, &[128]);
        assert_eq!(narrowed, vec![0x1000 + 512]);
    }

    #[test]
    fn test_revalidate_drops_stale_candidates() {
        let layout = RegionLayout::new(2, 2).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x1000, segment_with_regions(&layout, 1024, &[0, 512]), true)
            .unwrap();
        let report = discovery::scan(&image, &layout, &ScanOptions::new()).unwrap();
        assert_eq!(report.candidates.len(), 2);

        image.write_bytes(0x1000 + layout.magic_end_offset() as u64, &[0; 4]).unwrap();
        assert_eq!(
            discovery::revalidate(&image, &report.candidates, &layout),
            vec![0x1000 + 512]
        );
    }

    #[test]
    fn test_remote_producer_feeds_image_consumer_side() {
        let layout = RegionLayout::new(2, 1).unwrap();
        let image = Arc::new(
            MemoryImage::new(PID)
                .with_segment(0x7000, segment_with_regions(&layout, 256, &[40]), true)
                .unwrap(),
        );

        let remote = RemoteRegion::discover(Arc::clone(&image), layout, &ScanOptions::new()).unwrap();
        assert_eq!(remote.handle().base_address, 0x7000 + 40);
        let mut producer = Producer::new(remote);
        assert!(producer.try_produce(&[9, 8, 7, 6, 5, 4, 3, 2]).unwrap().is_written());
        assert!(!producer.try_produce(&[0; 8]).unwrap().is_written());

        // the owning side sees the same bytes through its own view
        let local = RemoteRegion::at_address(Arc::clone(&image), 0x7000 + 40, layout).unwrap();
        let mut consumer = Consumer::new(local);
        let frame = consumer.try_consume().unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[9, 8, 7, 6, 5, 4, 3, 2]);

        let mut flag = [0u8; 1];
        image.read_bytes(0x7000 + 40 + OWNERSHIP_OFFSET as u64, &mut flag).unwrap();
        assert_eq!(flag[0], Ownership::ProducerOwned.as_byte());
    }

    #[test]
    fn test_at_address_rejects_wrong_base() {
        let layout = RegionLayout::new(2, 1).unwrap();
        let image = MemoryImage::new(PID)
            .with_segment(0x7000, segment_with_regions(&layout, 256, &[40]), true)
            .unwrap();

        let err = RemoteRegion::at_address(&image, 0x7000 + 44, layout).unwrap_err();
        assert!(matches!(err, MemFrameError::LayoutCorrupt { .. }));
    }
}
