//! Sector arithmetic
//!
//! Every storage device in the system is addressed in fixed 512-byte
//! sectors. Higher layers work in byte offsets and counts; the helpers here
//! convert between the two and tell whether a byte quantity lands exactly on
//! a sector boundary.

use core::fmt;

/// Size of one storage sector in bytes
pub const SECTOR_SIZE: usize = 512;

/// Number of whole sectors covered by `bytes` (rounds down)
#[inline]
pub const fn sectors_in(bytes: u64) -> u64 {
    bytes / SECTOR_SIZE as u64
}

/// True if `bytes` is an exact multiple of [`SECTOR_SIZE`]
#[inline]
pub const fn is_aligned(bytes: u64) -> bool {
    bytes % SECTOR_SIZE as u64 == 0
}

/// Byte offset of the start of `sector`
#[inline]
pub const fn sector_offset(sector: u32) -> u64 {
    sector as u64 * SECTOR_SIZE as u64
}

/// Inclusive range of sectors `[begin, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    pub begin: u32,
    pub end: u32,
}

impl SectorRange {
    pub const fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Number of sectors in the range
    ///
    /// An inverted range (`end < begin`) is empty.
    pub const fn len(&self) -> u64 {
        if self.end < self.begin {
            0
        } else {
            (self.end - self.begin) as u64 + 1
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn contains(&self, sector: u32) -> bool {
        sector >= self.begin && sector <= self.end
    }

    /// Size of the range in bytes
    pub const fn byte_len(&self) -> u64 {
        self.len() * SECTOR_SIZE as u64
    }
}

impl fmt::Display for SectorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.begin, self.end)
    }
}
