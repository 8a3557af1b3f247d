//! Marker scanning over a foreign address space

use log::{debug, info, warn};

use crate::{
    error::{MemFrameError, Result},
    region_layout::{RegionLayout, MAGIC_SIZE},
    remote::{ProcessMemory, RemoteHandle},
};

use super::options::ScanOptions;

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Base addresses where both markers matched, ascending
    pub candidates: Vec<u64>,
    /// Start-marker hits, verified or not
    pub start_hits: usize,
    /// Ranges read completely
    pub ranges_scanned: usize,
    /// Ranges abandoned after a read failure
    pub ranges_skipped: usize,
    /// Bytes read from the target
    pub bytes_read: u64,
}

/// Offsets of every occurrence of `needle` in `haystack`, overlapping ones included
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(offset, _)| offset)
        .collect()
}

/// Find every region base in the target whose start and end markers both match
pub fn scan<M: ProcessMemory + ?Sized>(
    memory: &M,
    layout: &RegionLayout,
    options: &ScanOptions,
) -> Result<ScanReport> {
    options.validate()?;

    let (lo, hi) = options.bounds();
    let mut report = ScanReport::default();
    let mut hits = Vec::new();
    let mut buf = vec![0u8; options.chunk_size];

    for range in memory.mapped_ranges(options.writeable_only)? {
        // Read a little past the window so a marker starting just inside it is complete
        let Some((start, end)) = range.clip(lo, hi.saturating_add(MAGIC_SIZE as u64 - 1)) else {
            continue;
        };

        match scan_range(memory, start, end, &mut buf, &mut hits, &mut report.bytes_read) {
            Ok(()) => report.ranges_scanned += 1,
            Err(e) => {
                warn!(
                    "Failed to read range {:#x}-{:#x} ({}), skipping: {}",
                    start,
                    end,
                    range.path.as_deref().unwrap_or("anonymous"),
                    e
                );
                report.ranges_skipped += 1;
            }
        }
    }

    hits.retain(|&address| address >= lo && address < hi);
    hits.sort_unstable();
    hits.dedup();
    report.start_hits = hits.len();

    report.candidates = hits
        .into_iter()
        .filter(|&address| has_end_marker(memory, layout, address))
        .collect();

    info!(
        "Scanned pid {}: {} ranges ({} skipped), {} start markers, {} candidate regions",
        memory.pid(),
        report.ranges_scanned,
        report.ranges_skipped,
        report.start_hits,
        report.candidates.len()
    );
    Ok(report)
}

/// Locate exactly one region
///
/// Zero candidates yields [`MemFrameError::DiscoveryNotFound`], more than
/// one yields [`MemFrameError::DiscoveryAmbiguous`] carrying every base
/// address so the caller can [`narrow`] them.
pub fn discover<M: ProcessMemory + ?Sized>(
    memory: &M,
    layout: &RegionLayout,
    options: &ScanOptions,
) -> Result<RemoteHandle> {
    let report = scan(memory, layout, options)?;
    match report.candidates.as_slice() {
        [] => Err(MemFrameError::discovery_not_found(report.ranges_scanned)),
        [base] => Ok(RemoteHandle::new(memory.pid(), *base, layout.total_size())),
        _ => Err(MemFrameError::discovery_ambiguous(report.candidates)),
    }
}

/// Keep the candidates whose bytes at `base + offset` currently equal `expected`
///
/// Used to disambiguate after the real region changed in a known way,
/// e.g. after its owner flipped the ownership byte.
pub fn narrow<M: ProcessMemory + ?Sized>(
    memory: &M,
    candidates: &[u64],
    offset: usize,
    expected: &[u8],
) -> Vec<u64> {
    let mut buf = vec![0u8; expected.len()];
    candidates
        .iter()
        .copied()
        .filter(|&base| {
            base.checked_add(offset as u64)
                .map(|address| memory.read_bytes(address, &mut buf).is_ok() && buf == expected)
                .unwrap_or(false)
        })
        .collect()
}

/// Keep the candidates whose markers still both match
pub fn revalidate<M: ProcessMemory + ?Sized>(
    memory: &M,
    candidates: &[u64],
    layout: &RegionLayout,
) -> Vec<u64> {
    let start = RegionLayout::magic_start_bytes();
    narrow(memory, candidates, 0, &start)
        .into_iter()
        .filter(|&base| has_end_marker(memory, layout, base))
        .collect()
}

fn scan_range<M: ProcessMemory + ?Sized>(
    memory: &M,
    start: u64,
    end: u64,
    buf: &mut [u8],
    hits: &mut Vec<u64>,
    bytes_read: &mut u64,
) -> Result<()> {
    let needle = RegionLayout::magic_start_bytes();
    let mut pos = start;

    while pos < end {
        let len = (end - pos).min(buf.len() as u64) as usize;
        let chunk = &mut buf[..len];
        memory.read_bytes(pos, chunk)?;
        *bytes_read += len as u64;

        for offset in find_all(chunk, &needle) {
            debug!("Start marker at {:#x}", pos + offset as u64);
            hits.push(pos + offset as u64);
        }

        if pos + len as u64 >= end {
            break;
        }
        // overlap so a marker straddling two chunks is seen whole
        pos += (len - (MAGIC_SIZE - 1)) as u64;
    }
    Ok(())
}

fn has_end_marker<M: ProcessMemory + ?Sized>(memory: &M, layout: &RegionLayout, base: u64) -> bool {
    let Some(address) = base.checked_add(layout.magic_end_offset() as u64) else {
        return false;
    };
    let mut bytes = [0u8; MAGIC_SIZE];
    match memory.read_bytes(address, &mut bytes) {
        Ok(()) if bytes == RegionLayout::magic_end_bytes() => true,
        Ok(()) => {
            debug!("Start marker at {:#x} has no end marker", base);
            false
        }
        Err(e) => {
            debug!("End marker of {:#x} unreadable: {}", base, e);
            false
        }
    }
}
