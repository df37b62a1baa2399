//! Image backing store
//!
//! One [`ImageBackingStore`] sits behind every emulated drive and hides which
//! medium holds the drive's data:
//!
//! ```text
//!                 ImageBackingStore
//!        ┌───────────────┼────────────────┐
//!       Raw             File              Rom
//!  SD card sectors   FAT file on the   image in onboard
//!  (BlockDevice)     SD card (ImageFile)  flash (RomDrive)
//! ```
//!
//! The mode is chosen once at open time from the image descriptor. A plain
//! image file stored in one contiguous run is promoted to `Raw` so aligned
//! transfers bypass the filesystem. The file stays open; the first unaligned
//! seek, read or write drops the store back to `File` mode for good.
//!
//! Raw and ROM transfers are addressed in [`SECTOR_SIZE`] units. ROM drives
//! are only ever accessed in whole sectors, so an unaligned request there is
//! a caller bug and panics.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use common::sector::{is_aligned, sector_offset, sectors_in};
use common::{SECTOR_SIZE, SectorRange};
use drivers::device_manager::devices;
use drivers::hal::block_device::{BlockDevice, BlockDeviceError};
use drivers::hal::rom_drive::{RomDrive, RomDriveError, RomHeader};

use crate::config::{ConfigSource, SCSI_SECTION, USE_FAT_ALLOC_SIZE};
use crate::descriptor::Descriptor;
use crate::fs::{FileAttributes, FileSystem, FsError, ImageFile, OpenFlags};

/// Collaborators an image can be opened against
pub struct StorageContext<'a> {
    /// Card holding image files and raw partitions
    pub sd_card: Option<Arc<dyn BlockDevice>>,
    /// Onboard flash image, if the board has one
    pub rom_drive: Option<Arc<dyn RomDrive>>,
    pub fs: &'a dyn FileSystem,
    pub config: &'a dyn ConfigSource,
}

impl<'a> StorageContext<'a> {
    /// SD card handle, if one is registered and initialized
    fn ready_card(&self) -> Option<Arc<dyn BlockDevice>> {
        self.sd_card.clone().filter(|card| card.is_ready())
    }

    /// Take the SD card and ROM drive from the global device registry
    pub fn from_devices(fs: &'a dyn FileSystem, config: &'a dyn ConfigSource) -> Self {
        let mgr = devices().lock();
        Self {
            sd_card: mgr.sd_card(),
            rom_drive: mgr.rom_drive(),
            fs,
            config,
        }
    }
}

/// Which medium currently serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Raw,
    Rom,
    File,
}

/// Hard failure of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Store was never opened or has been closed
    Closed,
    /// Transfer would run past the mapped sectors
    OutOfRange,
    Device(BlockDeviceError),
    Rom(RomDriveError),
    File(FsError),
}

impl From<BlockDeviceError> for StoreError {
    fn from(err: BlockDeviceError) -> Self {
        StoreError::Device(err)
    }
}

impl From<RomDriveError> for StoreError {
    fn from(err: RomDriveError) -> Self {
        StoreError::Rom(err)
    }
}

impl From<FsError> for StoreError {
    fn from(err: FsError) -> Self {
        StoreError::File(err)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Closed => write!(f, "image not open"),
            StoreError::OutOfRange => write!(f, "access beyond end of image"),
            StoreError::Device(e) => write!(f, "SD card: {}", e),
            StoreError::Rom(e) => write!(f, "ROM drive: {}", e),
            StoreError::File(e) => write!(f, "image file: {}", e),
        }
    }
}

/// Sector range of the SD card mapped as the drive
struct RawMapping {
    /// Shared with the device registry; `None` once closed
    device: Option<Arc<dyn BlockDevice>>,
    range: SectorRange,
    cursor: u32,
}

impl RawMapping {
    fn new(device: Arc<dyn BlockDevice>, range: SectorRange) -> Self {
        Self {
            device: Some(device),
            range,
            cursor: range.begin,
        }
    }

    /// Number of sectors in a `len` byte transfer at the cursor, if it stays
    /// inside the mapping
    fn span(&self, len: usize) -> Result<u32, StoreError> {
        let count = u32::try_from(len / SECTOR_SIZE).map_err(|_| StoreError::OutOfRange)?;
        if count == 0 {
            return Ok(0);
        }
        let last = self
            .cursor
            .checked_add(count - 1)
            .ok_or(StoreError::OutOfRange)?;
        if self.cursor < self.range.begin || last > self.range.end {
            return Err(StoreError::OutOfRange);
        }
        Ok(count)
    }

    fn seek(&mut self, pos: u64) -> bool {
        if self.device.is_none() {
            return false;
        }
        let Some(sector) = u64::from(self.range.begin)
            .checked_add(sectors_in(pos))
            .and_then(|s| u32::try_from(s).ok())
        else {
            return false;
        };
        self.cursor = sector;
        self.cursor <= self.range.end
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let device = self.device.as_ref().ok_or(StoreError::Closed)?;
        let count = self.span(buf.len())?;
        device.read_sectors(self.cursor, buf)?;
        self.cursor += count;
        Ok(buf.len())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, StoreError> {
        let device = self.device.as_ref().ok_or(StoreError::Closed)?;
        let count = self.span(buf.len())?;
        device.write_sectors(self.cursor, buf)?;
        self.cursor += count;
        Ok(buf.len())
    }
}

/// Drive image in onboard flash
struct RomImage {
    drive: Arc<dyn RomDrive>,
    header: RomHeader,
    /// Zero once closed
    image_size: u64,
    cursor: u32,
}

impl RomImage {
    fn seek(&mut self, pos: u64) -> bool {
        assert!(is_aligned(pos), "unaligned ROM drive seek to byte {}", pos);
        let Ok(sector) = u32::try_from(sectors_in(pos)) else {
            return false;
        };
        self.cursor = sector;
        sector_offset(self.cursor) < self.image_size
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        assert!(
            is_aligned(buf.len() as u64),
            "unaligned ROM drive read of {} bytes",
            buf.len()
        );
        if self.image_size == 0 {
            return Err(StoreError::Closed);
        }
        self.drive.read(sector_offset(self.cursor), buf)?;
        self.cursor += (buf.len() / SECTOR_SIZE) as u32;
        Ok(buf.len())
    }
}

enum Mode {
    Raw(RawMapping),
    Rom(RomImage),
    File,
}

/// Backing storage of one emulated drive
///
/// Construction never fails; check [`is_open`](Self::is_open) before use.
pub struct ImageBackingStore {
    mode: Mode,
    /// Image file; retained as the fallback path when promoted to `Raw`
    file: Option<Box<dyn ImageFile>>,
    read_only_attr: bool,
}

impl ImageBackingStore {
    /// Store that reports itself closed
    fn unopened() -> Self {
        Self {
            mode: Mode::File,
            file: None,
            read_only_attr: false,
        }
    }

    /// Open the image named by `descriptor` for a drive with `block_size`
    /// byte blocks
    pub fn open(descriptor: &str, block_size: u32, ctx: &StorageContext<'_>) -> Self {
        match Descriptor::parse(descriptor) {
            Ok(Descriptor::Raw(range)) => Self::open_raw(range, block_size, ctx),
            Ok(Descriptor::Rom) => Self::open_rom(ctx),
            Ok(Descriptor::Path(path)) => Self::open_file(path, block_size, ctx),
            Err(e) => {
                log::info!("Invalid format for raw filename: {} ({})", descriptor, e);
                Self::unopened()
            }
        }
    }

    fn open_raw(mut range: SectorRange, block_size: u32, ctx: &StorageContext<'_>) -> Self {
        if block_size as usize % SECTOR_SIZE != 0 {
            log::info!(
                "SCSI block size {} is not supported for RAW partitions (must be divisible by {} bytes)",
                block_size,
                SECTOR_SIZE
            );
            return Self::unopened();
        }

        let Some(device) = ctx.ready_card() else {
            log::info!("No SD card ready for RAW mapping {}", range);
            return Self::unopened();
        };

        let sector_count = device.sector_count();
        if sector_count == 0 {
            log::info!("SD card reports no sectors, RAW mapping {} unavailable", range);
            return Self::unopened();
        }

        if range.end >= sector_count {
            log::info!("Limiting RAW image mapping to SD card sector count: {}", sector_count);
            range.end = sector_count - 1;
        }

        if range.begin > range.end {
            log::info!("RAW image mapping {} starts beyond the end of the SD card", range);
            return Self::unopened();
        }

        Self {
            mode: Mode::Raw(RawMapping::new(device, range)),
            file: None,
            read_only_attr: false,
        }
    }

    fn open_rom(ctx: &StorageContext<'_>) -> Self {
        let found = ctx
            .rom_drive
            .as_ref()
            .and_then(|drive| drive.header().map(|header| (drive.clone(), header)));

        match found {
            Some((drive, header)) if header.image_size > 0 => Self {
                mode: Mode::Rom(RomImage {
                    drive,
                    header,
                    image_size: u64::from(header.image_size),
                    cursor: 0,
                }),
                file: None,
                read_only_attr: false,
            },
            _ => {
                log::info!("ROM drive image not present");
                Self::unopened()
            }
        }
    }

    fn open_file(path: &str, block_size: u32, ctx: &StorageContext<'_>) -> Self {
        let read_only_attr = ctx
            .fs
            .attributes(path)
            .map(|attr| attr.contains(FileAttributes::READ_ONLY))
            .unwrap_or(false);

        let flags = if read_only_attr {
            log::info!("---- Image file is read-only, writes disabled");
            OpenFlags::READ
        } else {
            OpenFlags::RDWR
        };

        let mut file = match ctx.fs.open(path, flags) {
            Ok(file) => file,
            Err(e) => {
                log::info!("Failed to open image file {}: {}", path, e);
                return Self {
                    read_only_attr,
                    ..Self::unopened()
                };
            }
        };

        let mode = match Self::map_contiguous(&mut *file, block_size, ctx) {
            Some(raw) => Mode::Raw(raw),
            None => Mode::File,
        };

        Self {
            mode,
            file: Some(file),
            read_only_attr,
        }
    }

    /// Map a contiguously stored image straight onto SD card sectors
    fn map_contiguous(
        file: &mut dyn ImageFile,
        block_size: u32,
        ctx: &StorageContext<'_>,
    ) -> Option<RawMapping> {
        if block_size as usize % SECTOR_SIZE != 0 {
            return None;
        }
        let device = ctx.ready_card()?;

        let file_sectors = sectors_in(file.size());
        if file_sectors == 0 {
            return None;
        }

        // The allocation must extend past the last whole file sector; an
        // exact fit stays in file mode
        let extent = file.contiguous_range().ok()?;
        let fit_end = u64::from(extent.begin) + file_sectors;
        if u64::from(extent.end) < fit_end {
            return None;
        }

        let mut exposed = file_sectors;
        if u64::from(extent.end) != fit_end
            && ctx.config.get_bool(SCSI_SECTION, USE_FAT_ALLOC_SIZE, false)
        {
            log::info!(
                "Using FAT allocation size of {} sectors instead of file size of {} sectors",
                extent.len(),
                file_sectors
            );
            exposed = extent.len();
        }

        // exposed <= extent.len(), so the end stays inside the allocation
        let range = SectorRange::new(extent.begin, extent.begin + (exposed - 1) as u32);

        if let Err(e) = file.flush() {
            log::debug!("Flush before raw mapping failed: {}", e);
        }

        log::debug!("Image file is contiguous, mapping sectors {}", range);
        Some(RawMapping::new(device, range))
    }

    /// Drop from `Raw` to `File` if `bytes` is not a whole number of sectors
    ///
    /// This is the only transition out of `Raw`; nothing ever enters it
    /// after open. The file picks up at the raw cursor.
    fn demote_if_unaligned(&mut self, bytes: u64) {
        let Mode::Raw(raw) = &self.mode else {
            return;
        };
        if is_aligned(bytes) {
            return;
        }

        log::debug!("---- Unaligned access to image, falling back to file access mode");
        let pos = sector_offset(raw.cursor - raw.range.begin);
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.seek(pos) {
                log::debug!("Fallback file seek to {} failed: {}", pos, e);
            }
        }
        self.mode = Mode::File;
    }

    pub fn mode(&self) -> StoreMode {
        match self.mode {
            Mode::Raw(_) => StoreMode::Raw,
            Mode::Rom(_) => StoreMode::Rom,
            Mode::File => StoreMode::File,
        }
    }

    pub fn is_open(&self) -> bool {
        match &self.mode {
            Mode::Raw(raw) => raw.device.is_some(),
            Mode::Rom(rom) => rom.image_size > 0,
            Mode::File => self.file.as_ref().is_some_and(|f| f.is_open()),
        }
    }

    /// False for ROM images and files with the read-only attribute
    ///
    /// A promoted file keeps the attribute it was opened with.
    pub fn is_writable(&self) -> bool {
        !self.is_rom() && !self.read_only_attr
    }

    pub fn is_rom(&self) -> bool {
        matches!(self.mode, Mode::Rom(_))
    }

    /// Header of the flash image in ROM mode
    pub fn rom_header(&self) -> Option<RomHeader> {
        match &self.mode {
            Mode::Rom(rom) => Some(rom.header),
            _ => None,
        }
    }

    /// Size of the image in bytes
    pub fn size(&self) -> u64 {
        match &self.mode {
            Mode::Raw(raw) => raw.range.byte_len(),
            Mode::Rom(rom) => rom.image_size,
            Mode::File => self.file.as_ref().map_or(0, |f| f.size()),
        }
    }

    /// SD card sectors holding the image
    ///
    /// ROM images report the placeholder range `0..=0`; they do not live on
    /// the card.
    pub fn contiguous_range(&self) -> Option<SectorRange> {
        match &self.mode {
            Mode::Raw(raw) => Some(raw.range),
            Mode::Rom(_) => Some(SectorRange::new(0, 0)),
            Mode::File => self.file.as_ref()?.contiguous_range().ok(),
        }
    }

    /// Move to byte offset `pos`, returning false if it is past the end
    pub fn seek(&mut self, pos: u64) -> bool {
        self.demote_if_unaligned(pos);

        match &mut self.mode {
            Mode::Raw(raw) => raw.seek(pos),
            Mode::Rom(rom) => rom.seek(pos),
            Mode::File => self.file.as_mut().is_some_and(|f| f.seek(pos).is_ok()),
        }
    }

    /// Read `buf.len()` bytes at the current position
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.demote_if_unaligned(buf.len() as u64);

        match &mut self.mode {
            Mode::Raw(raw) => raw.read(buf),
            Mode::Rom(rom) => rom.read(buf),
            Mode::File => {
                let file = self.file.as_mut().ok_or(StoreError::Closed)?;
                Ok(file.read(buf)?)
            }
        }
    }

    /// Write `buf` at the current position
    ///
    /// Returns the number of bytes written. Zero means the write was refused
    /// or failed; the reason is logged.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        self.demote_if_unaligned(buf.len() as u64);

        match &mut self.mode {
            Mode::Rom(_) => {
                log::error!("ERROR: attempted to write to ROM drive");
                0
            }
            _ if self.read_only_attr => {
                log::error!("ERROR: attempted to write to a read only image");
                0
            }
            Mode::Raw(raw) => {
                let sector = raw.cursor;
                raw.write(buf).unwrap_or_else(|e| {
                    log::error!("Write of {} bytes at sector {} failed: {}", buf.len(), sector, e);
                    0
                })
            }
            Mode::File => match self.file.as_mut() {
                Some(file) => file.write(buf).unwrap_or_else(|e| {
                    log::error!("Image file write of {} bytes failed: {}", buf.len(), e);
                    0
                }),
                None => 0,
            },
        }
    }

    /// Flush file mode writes; raw and ROM access is unbuffered
    pub fn flush(&mut self) {
        if !matches!(self.mode, Mode::File) || self.read_only_attr {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.flush() {
                log::error!("Image file flush failed: {}", e);
            }
        }
    }

    /// Current byte offset in file mode, zero otherwise
    pub fn position(&self) -> u64 {
        match &self.mode {
            Mode::File => self.file.as_ref().map_or(0, |f| f.position()),
            _ => 0,
        }
    }

    /// Release the image
    ///
    /// Raw mappings only drop their handle on the SD card; the card itself
    /// stays registered. Closing raw and ROM stores always succeeds and can
    /// be repeated. File mode reports the filesystem's result.
    pub fn close(&mut self) -> bool {
        match &mut self.mode {
            Mode::Raw(raw) => {
                raw.device = None;
                if let Some(mut file) = self.file.take() {
                    if let Err(e) = file.close() {
                        log::debug!("Closing fallback image file failed: {}", e);
                    }
                }
                true
            }
            Mode::Rom(rom) => {
                rom.image_size = 0;
                true
            }
            Mode::File => match self.file.as_mut() {
                Some(file) => file.close().is_ok(),
                None => false,
            },
        }
    }
}

impl fmt::Debug for ImageBackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ImageBackingStore");
        s.field("mode", &self.mode());
        match &self.mode {
            Mode::Raw(raw) => {
                s.field("range", &raw.range).field("cursor", &raw.cursor);
            }
            Mode::Rom(rom) => {
                s.field("image_size", &rom.image_size).field("cursor", &rom.cursor);
            }
            Mode::File => {
                s.field("file", &format_args!("<file>"));
            }
        }
        s.field("read_only", &self.read_only_attr).finish()
    }
}
