//! ROM Drive Hardware Abstraction Layer
//!
//! A ROM drive is a read-only disk image programmed into onboard flash next
//! to the firmware. The region starts with a one-sector header describing
//! the image, followed by the image data itself.
//!
//! # Header layout (little-endian)
//!
//! | offset | size | field        |
//! |--------|------|--------------|
//! | 0      | 8    | magic `ROMDRIVE` |
//! | 8      | 4    | image size in bytes |
//! | 12     | 4    | SCSI block size |
//! | 16     | 4    | drive type |
//! | 20     | 1    | SCSI id |
//!
//! The rest of the header sector is reserved.

use core::fmt;

use common::SECTOR_SIZE;

/// Magic bytes at the start of a programmed ROM drive region
pub const ROM_MAGIC: [u8; 8] = *b"ROMDRIVE";

/// Size of the header in flash; image data starts right after it
pub const ROM_HEADER_SIZE: usize = SECTOR_SIZE;

/// Parsed ROM drive header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomHeader {
    /// Image size in bytes
    pub image_size: u32,
    /// Block size the image was created for
    pub block_size: u32,
    /// Emulated device type code
    pub drive_type: u32,
    /// SCSI id the image is meant to appear at
    pub scsi_id: u8,
}

impl RomHeader {
    /// Parse a header from the start of the flash region
    pub fn parse(raw: &[u8]) -> Result<Self, RomHeaderError> {
        if raw.len() < 21 {
            return Err(RomHeaderError::Truncated);
        }

        if raw[0..8] != ROM_MAGIC {
            return Err(RomHeaderError::BadMagic);
        }

        let image_size = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
        let block_size = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        let drive_type = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]);

        Ok(Self {
            image_size,
            block_size,
            drive_type,
            scsi_id: raw[20],
        })
    }

    /// Serialize into a full header sector
    pub fn to_bytes(&self) -> [u8; ROM_HEADER_SIZE] {
        let mut raw = [0u8; ROM_HEADER_SIZE];
        raw[0..8].copy_from_slice(&ROM_MAGIC);
        raw[8..12].copy_from_slice(&self.image_size.to_le_bytes());
        raw[12..16].copy_from_slice(&self.block_size.to_le_bytes());
        raw[16..20].copy_from_slice(&self.drive_type.to_le_bytes());
        raw[20] = self.scsi_id;
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomHeaderError {
    /// Region too small to hold a header
    Truncated,
    /// Region was never programmed with a drive image
    BadMagic,
}

impl fmt::Display for RomHeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomHeaderError::Truncated => write!(f, "ROM drive header truncated"),
            RomHeaderError::BadMagic => write!(f, "no ROM drive header found"),
        }
    }
}

/// ROM drive errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomDriveError {
    /// No image programmed
    NotPresent,
    /// Read extends past the end of the image
    OutOfRange,
    /// Flash controller reported a failure
    ReadError,
}

impl fmt::Display for RomDriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomDriveError::NotPresent => write!(f, "ROM drive not present"),
            RomDriveError::OutOfRange => write!(f, "read past end of ROM image"),
            RomDriveError::ReadError => write!(f, "flash read error"),
        }
    }
}

/// Read-only drive image in onboard flash
pub trait RomDrive: Send + Sync {
    /// Header of the programmed image, or `None` if no image is present
    fn header(&self) -> Option<RomHeader>;

    /// Read `buf.len()` bytes of image data starting at byte `offset`
    ///
    /// Offsets are relative to the start of the image, not the header.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), RomDriveError>;
}
