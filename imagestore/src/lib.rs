//! Drive image storage
//!
//! Everything an emulated SCSI drive needs to reach its data, whichever
//! medium holds it:
//!
//! - [`backing_store`]: [`ImageBackingStore`], the per-drive storage handle
//! - [`descriptor`]: parsing of `RAW:`, `ROM:` and path descriptors
//! - [`fs`]: the filesystem interface image files are opened through
//! - [`config`]: INI settings that affect how images are exposed
//!
//! # Usage Example
//!
//! ```no_run
//! use imagestore::{ImageBackingStore, IniConfig, StorageContext};
//! # fn fs() -> &'static dyn imagestore::fs::FileSystem { unimplemented!() }
//!
//! let fs = fs();
//! let config = IniConfig::load(fs, imagestore::config::CONFIG_FILE);
//! let ctx = StorageContext::from_devices(fs, &config);
//!
//! let mut store = ImageBackingStore::open("HD10_512.hda", 512, &ctx);
//! if store.is_open() && store.seek(0) {
//!     let mut sector = [0u8; 512];
//!     store.read(&mut sector).ok();
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod backing_store;
pub mod config;
pub mod descriptor;
pub mod fs;

#[cfg(test)]
mod testing;

pub use backing_store::{ImageBackingStore, StorageContext, StoreError, StoreMode};
pub use config::{ConfigSource, IniConfig, NoConfig};
pub use descriptor::{Descriptor, DescriptorError};

extern crate alloc;
