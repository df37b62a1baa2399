//! Definitions shared between the storage drivers and the image layer.

#![cfg_attr(not(test), no_std)]

pub mod sector;

pub use sector::{SECTOR_SIZE, SectorRange};
