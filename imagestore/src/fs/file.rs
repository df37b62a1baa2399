use super::FsError;
use common::SectorRange;

/// An open file on the SD card filesystem
///
/// Byte oriented, with an implicit cursor like a C stdio stream. A file
/// handle is owned by exactly one user and closed through [`close`] or by
/// dropping it.
///
/// [`close`]: ImageFile::close
pub trait ImageFile: Send {
    fn is_open(&self) -> bool;

    /// File size in bytes
    fn size(&self) -> u64;

    /// Move the cursor to absolute byte offset `pos`
    fn seek(&mut self, pos: u64) -> Result<(), FsError>;

    /// Read from the cursor, returning the number of bytes read
    ///
    /// Short reads happen at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Write at the cursor, returning the number of bytes written
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError>;

    /// Push cached directory entry and data to the card
    fn flush(&mut self) -> Result<(), FsError>;

    fn close(&mut self) -> Result<(), FsError>;

    /// Current cursor position in bytes
    fn position(&self) -> u64;

    /// Sectors of the underlying block device that hold the file
    ///
    /// Covers whole clusters, so it can be larger than the file itself.
    /// Fails with [`FsError::Fragmented`] if the file is not one run.
    fn contiguous_range(&self) -> Result<SectorRange, FsError>;
}
