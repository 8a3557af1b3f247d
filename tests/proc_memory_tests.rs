//! Tests for live process memory access, run against our own process

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use memframe::{
        discovery::{self, ScanOptions},
        memory::{RegionConfig, SharedRegion},
        protocol::{Consumer, Producer},
        region_layout::{OWNERSHIP_OFFSET, PAYLOAD_OFFSET},
        remote::{AccessMethod, ProcMemory, ProcessMemory, RemoteRegion},
        MemFrameError, Ownership,
    };

    fn window(region: &SharedRegion) -> ScanOptions {
        ScanOptions::new().within(region.base_address(), region.base_address() + region.len() as u64)
    }

    #[test]
    fn test_maps_cover_region() {
        let region = SharedRegion::create(RegionConfig::new("maps", 8, 8)).unwrap();
        let memory = ProcMemory::open_self(AccessMethod::ProcMem).unwrap();

        let ranges = memory.mapped_ranges(true).unwrap();
        assert!(ranges.iter().any(|r| r.contains(region.base_address())));
        assert!(ranges.iter().all(|r| r.readable && r.writable));
    }

    #[test]
    fn test_read_and_write_own_memory() {
        let region = SharedRegion::create(RegionConfig::new("rw", 2, 2)).unwrap();
        let memory = ProcMemory::open_self(AccessMethod::ProcMem).unwrap();

        let mut start = [0u8; 4];
        memory.read_bytes(region.base_address(), &mut start).unwrap();
        assert_eq!(start, region.read_marker(0).unwrap());

        memory
            .write_bytes(region.base_address() + PAYLOAD_OFFSET as u64, &[5, 6, 7, 8])
            .unwrap();
        let mut payload = [0u8; 4];
        region.read_at(PAYLOAD_OFFSET, &mut payload).unwrap();
        assert_eq!(payload, [5, 6, 7, 8]);
    }

    #[test]
    fn test_unmapped_read_fails() {
        let memory = ProcMemory::open_self(AccessMethod::ProcMem).unwrap();
        let mut buf = [0u8; 4];
        assert!(memory.read_bytes(0, &mut buf).is_err());
    }

    #[test]
    fn test_invalid_pid_rejected() {
        assert!(matches!(
            ProcMemory::open(0, AccessMethod::ProcMem),
            Err(MemFrameError::InvalidParameter { .. })
        ));
        // beyond pid_max on any default configuration
        assert!(matches!(
            ProcMemory::open(i32::MAX, AccessMethod::ProcMem),
            Err(MemFrameError::ProcessUnavailable { .. })
        ));
    }

    #[test]
    fn test_discover_within_window() {
        let region = SharedRegion::create(RegionConfig::new("window", 16, 4)).unwrap();
        let memory = ProcMemory::open_self(AccessMethod::ProcMem).unwrap();

        let handle = discovery::discover(&memory, region.layout(), &window(&region)).unwrap();
        assert_eq!(handle, region.handle());
    }

    #[test]
    fn test_remote_producer_into_own_region() {
        let region = SharedRegion::create(RegionConfig::new("self_produce", 2, 1)).unwrap();
        let memory = ProcMemory::open_self(AccessMethod::ProcMem).unwrap();

        let remote = RemoteRegion::discover(memory, *region.layout(), &window(&region)).unwrap();
        let mut producer = Producer::new(remote);
        assert!(producer.try_produce(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap().is_written());
        assert_eq!(region.ownership().unwrap(), Ownership::ConsumerOwned);

        let mut consumer = Consumer::new(&region);
        let frame = consumer.try_consume().unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut flag = [0u8; 1];
        producer
            .region()
            .memory()
            .read_bytes(region.base_address() + OWNERSHIP_OFFSET as u64, &mut flag)
            .unwrap();
        assert_eq!(flag[0], 0);
    }
}
