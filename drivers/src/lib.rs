//! Storage Driver Subsystem
//!
//! This crate provides the device side of the image storage stack:
//!
//! # Module Organization
//!
//! - [`hal`]: Platform-independent trait definitions for block devices and
//!   the onboard ROM drive
//! - [`device_manager`]: Global registry handing out shared device handles
//! - [`ram`]: In-memory devices (feature `ram-disk`) for host builds and tests
//!
//! # Usage Example
//!
//! ```no_run
//! use drivers::device_manager::{Device, devices};
//! use drivers::hal::block_device::BlockDevice;
//! use drivers::ram::RamDisk;
//!
//! devices()
//!     .lock()
//!     .register("sd0".into(), Device::new_block(RamDisk::new(2048)));
//!
//! let card = devices().lock().sd_card().unwrap();
//! assert_eq!(card.sector_count(), 2048);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod device_manager;
pub mod hal;

cfg_if::cfg_if! {
    if #[cfg(feature = "ram-disk")] {
        pub mod ram;
        pub use ram::{FlashRomDrive, RamDisk};
    }
}

// Re-export commonly used types
pub use common::{SECTOR_SIZE, SectorRange};
pub use hal::block_device::{BlockDevice, BlockDeviceError, BlockDeviceInfo};
pub use hal::rom_drive::{RomDrive, RomDriveError, RomHeader};

extern crate alloc;
