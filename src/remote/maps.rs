//! Memory range descriptions and `/proc/<pid>/maps` parsing

use serde::{Deserialize, Serialize};

use crate::error::{MemFrameError, Result};

/// One mapped, readable address range of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    pub writable: bool,
    /// Backing path or pseudo-name (`[heap]`, `[stack]`), if any
    pub path: Option<String>,
}

impl MemoryRange {
    pub fn new(start: u64, end: u64, writable: bool) -> Self {
        Self {
            start,
            end,
            readable: true,
            writable,
            path: None,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }

    /// Intersection with `[lo, hi)`, if non-empty
    pub fn clip(&self, lo: u64, hi: u64) -> Option<(u64, u64)> {
        let start = self.start.max(lo);
        let end = self.end.min(hi);
        (start < end).then_some((start, end))
    }
}

/// Parse a single maps line:
/// `7f1c2a000000-7f1c2a021000 rw-p 00000000 00:00 0    [heap]`
pub fn parse_maps_line(line: &str) -> Result<MemoryRange> {
    let mut fields = line.split_whitespace();

    let bounds = fields
        .next()
        .ok_or_else(|| MemFrameError::invalid_parameter("maps", "Empty maps line"))?;
    let perms = fields
        .next()
        .ok_or_else(|| MemFrameError::invalid_parameter("maps", "Missing permissions field"))?;

    let (start, end) = bounds
        .split_once('-')
        .ok_or_else(|| MemFrameError::invalid_parameter("maps", "Malformed address range"))?;
    let parse_hex = |s: &str| {
        u64::from_str_radix(s, 16).map_err(|_| {
            MemFrameError::invalid_parameter("maps", format!("Bad address '{}'", s))
        })
    };
    let start = parse_hex(start)?;
    let end = parse_hex(end)?;
    if end < start {
        return Err(MemFrameError::invalid_parameter("maps", "Range end before start"));
    }

    // offset, dev, inode
    let path = fields.nth(3).map(|first| {
        // paths may contain spaces
        std::iter::once(first)
            .chain(fields)
            .collect::<Vec<_>>()
            .join(" ")
    });

    Ok(MemoryRange {
        start,
        end,
        readable: perms.starts_with('r'),
        writable: perms.as_bytes().get(1) == Some(&b'w'),
        path,
    })
}

/// Parse the full maps text, keeping readable ranges (and only writable
/// ones when `writeable_only` is set)
pub fn parse_maps(text: &str, writeable_only: bool) -> Result<Vec<MemoryRange>> {
    let mut ranges = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let range = parse_maps_line(line)?;
        if !range.readable || (writeable_only && !range.writable) {
            continue;
        }
        ranges.push(range);
    }
    Ok(ranges)
}
