//! Block Device Hardware Abstraction Layer
//!
//! This module provides the trait for sector-addressed storage such as the
//! SD card that holds drive images.
//!
//! # Architecture
//!
//! ```text
//! Image Backing Store (RAW / file / ROM dispatch)
//!           ↓
//! Block Device HAL ← You are here
//!           ↓
//! Platform Drivers (SDIO, SPI-SD, RAM disk)
//! ```
//!
//! All addressing is in units of [`SECTOR_SIZE`] bytes. Sector indices are
//! 32-bit, matching the SD card command set.

use core::fmt;

use common::SECTOR_SIZE;

/// Block device information
#[derive(Debug, Clone, Copy)]
pub struct BlockDeviceInfo {
    /// Total number of sectors
    pub sector_count: u32,
}

impl BlockDeviceInfo {
    /// Create info for a device with `sector_count` sectors
    pub const fn new(sector_count: u32) -> Self {
        Self { sector_count }
    }
}

/// Block device errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDeviceError {
    /// Card not initialized or ejected
    NotReady,
    /// Sector address out of range
    InvalidAddress,
    /// Buffer length is not a whole number of sectors
    InvalidBuffer,
    /// Hardware error during read
    ReadError,
    /// Hardware error during write
    WriteError,
    /// Device is write-protected
    WriteProtected,
}

impl fmt::Display for BlockDeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockDeviceError::NotReady => write!(f, "device not ready"),
            BlockDeviceError::InvalidAddress => write!(f, "sector address out of range"),
            BlockDeviceError::InvalidBuffer => write!(f, "buffer is not sector sized"),
            BlockDeviceError::ReadError => write!(f, "read error"),
            BlockDeviceError::WriteError => write!(f, "write error"),
            BlockDeviceError::WriteProtected => write!(f, "device is write-protected"),
        }
    }
}

/// Block device trait - fundamental storage abstraction
///
/// Methods take `&self`: a device is registered once and shared through
/// `Arc` by every drive mapped onto it, so implementations that mutate
/// state use interior locking.
///
/// # Example
///
/// ```rust
/// use drivers::hal::block_device::{BlockDevice, BlockDeviceError};
///
/// fn read_mbr<B: BlockDevice>(device: &B) -> Result<[u8; 512], BlockDeviceError> {
///     let mut buf = [0u8; 512];
///     device.read_sectors(0, &mut buf)?;
///     Ok(buf)
/// }
/// ```
pub trait BlockDevice: Send + Sync {
    /// Get device information
    fn info(&self) -> BlockDeviceInfo;

    /// Total number of addressable sectors
    fn sector_count(&self) -> u32 {
        self.info().sector_count
    }

    /// Read contiguous sectors starting at `start_sector`
    ///
    /// `buf.len()` must be a multiple of [`SECTOR_SIZE`]; the number of
    /// sectors transferred is `buf.len() / SECTOR_SIZE`.
    ///
    /// # Errors
    /// - `NotReady`: Card not initialized or ejected
    /// - `InvalidAddress`: Range runs past the end of the device
    /// - `InvalidBuffer`: Buffer length not sector aligned
    /// - `ReadError`: Hardware failure
    fn read_sectors(&self, start_sector: u32, buf: &mut [u8]) -> Result<(), BlockDeviceError>;

    /// Write contiguous sectors starting at `start_sector`
    ///
    /// # Errors
    /// - `NotReady`: Card not initialized or ejected
    /// - `InvalidAddress`: Range runs past the end of the device
    /// - `InvalidBuffer`: Buffer length not sector aligned
    /// - `WriteProtected`: Device is read-only
    /// - `WriteError`: Hardware failure
    fn write_sectors(&self, start_sector: u32, buf: &[u8]) -> Result<(), BlockDeviceError>;

    /// Whether the card is initialized and can take transfers
    fn is_ready(&self) -> bool {
        true
    }
}

/// Validate a transfer of `len` bytes at `start_sector` against a device of
/// `sector_count` sectors
///
/// Returns the number of sectors covered. Zero-length transfers are valid at
/// any address up to and including `sector_count`.
pub fn check_transfer(sector_count: u32, start_sector: u32, len: usize) -> Result<u32, BlockDeviceError> {
    if len % SECTOR_SIZE != 0 {
        return Err(BlockDeviceError::InvalidBuffer);
    }

    let count = u32::try_from(len / SECTOR_SIZE).map_err(|_| BlockDeviceError::InvalidAddress)?;
    let end = start_sector
        .checked_add(count)
        .ok_or(BlockDeviceError::InvalidAddress)?;

    if end > sector_count {
        return Err(BlockDeviceError::InvalidAddress);
    }

    Ok(count)
}
