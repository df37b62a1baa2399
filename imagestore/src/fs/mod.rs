//! Filesystem collaborator interface
//!
//! Image files live on the SD card's FAT filesystem. The backing store only
//! needs attribute lookup and open from the filesystem itself; everything
//! else goes through the opened [`ImageFile`].

use alloc::boxed::Box;
use core::fmt;

pub mod file;

pub use file::ImageFile;

bitflags::bitflags! {
    /// FAT directory entry attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

bitflags::bitflags! {
    /// Open flags for files
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const RDWR = Self::READ.bits() | Self::WRITE.bits();
    }
}

pub trait FileSystem: Send + Sync {
    /// Get the directory entry attributes of `path`
    fn attributes(&self, path: &str) -> Result<FileAttributes, FsError>;

    /// Open an existing file
    fn open(&self, path: &str, flags: OpenFlags) -> Result<Box<dyn ImageFile>, FsError>;
}

/// Filesystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    PermissionDenied,
    NotOpen,
    /// File is not stored as one contiguous run of sectors
    Fragmented,
    InvalidSeek,
    NoSpace,
    IoError,
    NotSupported,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "file not found"),
            FsError::PermissionDenied => write!(f, "permission denied"),
            FsError::NotOpen => write!(f, "file not open"),
            FsError::Fragmented => write!(f, "file is fragmented"),
            FsError::InvalidSeek => write!(f, "invalid seek"),
            FsError::NoSpace => write!(f, "no space left on device"),
            FsError::IoError => write!(f, "I/O error"),
            FsError::NotSupported => write!(f, "operation not supported"),
        }
    }
}
