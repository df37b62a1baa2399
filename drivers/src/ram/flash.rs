use alloc::vec::Vec;

use crate::hal::rom_drive::{ROM_HEADER_SIZE, RomDrive, RomDriveError, RomHeader};

/// ROM drive over an in-memory copy of the flash region
///
/// The region is laid out exactly like programmed flash: header sector
/// first, image data after it.
pub struct FlashRomDrive {
    region: Vec<u8>,
}

impl FlashRomDrive {
    /// Wrap a raw flash region (header + image)
    pub fn new(region: Vec<u8>) -> Self {
        Self { region }
    }

    /// Build a region from a header and image data
    pub fn from_image(header: RomHeader, image: &[u8]) -> Self {
        let mut region = Vec::with_capacity(ROM_HEADER_SIZE + image.len());
        region.extend_from_slice(&header.to_bytes());
        region.extend_from_slice(image);
        Self { region }
    }

    /// Flash region that was never programmed
    pub fn blank() -> Self {
        Self::new(alloc::vec![0xFF; ROM_HEADER_SIZE])
    }

    fn image(&self) -> &[u8] {
        self.region.get(ROM_HEADER_SIZE..).unwrap_or(&[])
    }
}

impl RomDrive for FlashRomDrive {
    fn header(&self) -> Option<RomHeader> {
        match RomHeader::parse(&self.region) {
            Ok(header) => Some(header),
            Err(e) => {
                log::debug!("ROM drive: {}", e);
                None
            }
        }
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), RomDriveError> {
        let header = self.header().ok_or(RomDriveError::NotPresent)?;
        let image = self.image();
        let limit = u64::from(header.image_size).min(image.len() as u64);

        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(RomDriveError::OutOfRange)?;
        if end > limit {
            return Err(RomDriveError::OutOfRange);
        }

        buf.copy_from_slice(&image[offset as usize..end as usize]);
        Ok(())
    }
}
