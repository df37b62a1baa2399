//! In-memory storage devices
//!
//! Stand-ins for the SD card and the flash ROM drive, used when running the
//! image layer on a host and in tests.

mod disk;
mod flash;

pub use disk::RamDisk;
pub use flash::FlashRomDrive;
