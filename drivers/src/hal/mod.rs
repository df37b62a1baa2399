//! Hardware Abstraction Layer (HAL) - Platform-Independent Traits
//!
//! This module defines generic traits for the storage hardware an emulated
//! drive can be backed by. Platform drivers (SD card host controller, flash
//! controller) implement them; the image layer only ever talks to these
//! traits.
//!
//! # Available Interfaces
//!
//! - [`block_device`]: Sector-addressed block storage (SD card)
//! - [`rom_drive`]: Read-only drive image stored in onboard flash

pub mod block_device;
pub mod rom_drive;
