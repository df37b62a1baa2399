use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::SECTOR_SIZE;
use spin::Mutex;

use crate::hal::block_device::{BlockDevice, BlockDeviceError, BlockDeviceInfo, check_transfer};

/// Block device backed by a heap buffer
pub struct RamDisk {
    sectors: Mutex<Vec<u8>>,
    sector_count: u32,
    ready: AtomicBool,
    read_only: AtomicBool,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl RamDisk {
    /// Create a zero-filled disk of `sector_count` sectors
    pub fn new(sector_count: u32) -> Self {
        Self::from_bytes(vec![0u8; sector_count as usize * SECTOR_SIZE])
    }

    /// Create a disk holding `data`, padded to a whole sector
    pub fn from_bytes(mut data: Vec<u8>) -> Self {
        let rem = data.len() % SECTOR_SIZE;
        if rem != 0 {
            data.resize(data.len() + SECTOR_SIZE - rem, 0);
        }
        let sector_count = (data.len() / SECTOR_SIZE) as u32;

        Self {
            sectors: Mutex::new(data),
            sector_count,
            ready: AtomicBool::new(true),
            read_only: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate card insertion or ejection
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Toggle the write-protect switch
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// Make every subsequent transfer fail as a hardware error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of successful `write_sectors` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Copy of the raw contents of `sector`
    pub fn sector(&self, sector: u32) -> Option<Vec<u8>> {
        let start = sector as usize * SECTOR_SIZE;
        self.sectors
            .lock()
            .get(start..start + SECTOR_SIZE)
            .map(|s| s.to_vec())
    }
}

impl BlockDevice for RamDisk {
    fn info(&self) -> BlockDeviceInfo {
        BlockDeviceInfo::new(self.sector_count)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    fn read_sectors(&self, start_sector: u32, buf: &mut [u8]) -> Result<(), BlockDeviceError> {
        if !self.is_ready() {
            return Err(BlockDeviceError::NotReady);
        }
        check_transfer(self.sector_count, start_sector, buf.len())?;
        if self.failing.load(Ordering::Relaxed) {
            return Err(BlockDeviceError::ReadError);
        }

        let start = start_sector as usize * SECTOR_SIZE;
        let end = start + buf.len();
        buf.copy_from_slice(&self.sectors.lock()[start..end]);
        Ok(())
    }

    fn write_sectors(&self, start_sector: u32, buf: &[u8]) -> Result<(), BlockDeviceError> {
        if !self.is_ready() {
            return Err(BlockDeviceError::NotReady);
        }
        check_transfer(self.sector_count, start_sector, buf.len())?;
        if self.read_only.load(Ordering::Relaxed) {
            return Err(BlockDeviceError::WriteProtected);
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(BlockDeviceError::WriteError);
        }

        let start = start_sector as usize * SECTOR_SIZE;
        self.sectors.lock()[start..start + buf.len()].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
