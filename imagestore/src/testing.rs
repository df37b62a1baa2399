//! In-memory filesystem for tests

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use common::SectorRange;
use spin::Mutex;

use crate::fs::{FileAttributes, FileSystem, FsError, ImageFile, OpenFlags};

/// Contents and bookkeeping of one file
pub struct MemEntry {
    pub data: Vec<u8>,
    pub attributes: FileAttributes,
    /// Reported by `contiguous_range`; `None` means fragmented
    pub range: Option<SectorRange>,
    pub writes: usize,
    pub flushes: usize,
    /// Fail `close` with an I/O error
    pub fail_close: bool,
}

pub type EntryHandle = Arc<Mutex<MemEntry>>;

#[derive(Default)]
pub struct MemFs {
    files: Mutex<BTreeMap<String, EntryHandle>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a writable, fragmented file
    pub fn add(&self, path: &str, data: Vec<u8>) -> EntryHandle {
        let entry = Arc::new(Mutex::new(MemEntry {
            data,
            attributes: FileAttributes::ARCHIVE,
            range: None,
            writes: 0,
            flushes: 0,
            fail_close: false,
        }));
        self.files.lock().insert(String::from(path), entry.clone());
        entry
    }

    /// Add a file stored contiguously at `range`
    pub fn add_contiguous(&self, path: &str, data: Vec<u8>, range: SectorRange) -> EntryHandle {
        let entry = self.add(path, data);
        entry.lock().range = Some(range);
        entry
    }
}

impl FileSystem for MemFs {
    fn attributes(&self, path: &str) -> Result<FileAttributes, FsError> {
        let files = self.files.lock();
        let entry = files.get(path).ok_or(FsError::NotFound)?;
        Ok(entry.lock().attributes)
    }

    fn open(&self, path: &str, flags: OpenFlags) -> Result<Box<dyn ImageFile>, FsError> {
        let entry = self
            .files
            .lock()
            .get(path)
            .cloned()
            .ok_or(FsError::NotFound)?;

        let writable = flags.contains(OpenFlags::WRITE);
        if writable && entry.lock().attributes.contains(FileAttributes::READ_ONLY) {
            return Err(FsError::PermissionDenied);
        }

        Ok(Box::new(MemFile {
            entry,
            pos: 0,
            open: true,
            writable,
        }))
    }
}

pub struct MemFile {
    entry: EntryHandle,
    pos: u64,
    open: bool,
    writable: bool,
}

impl ImageFile for MemFile {
    fn is_open(&self) -> bool {
        self.open
    }

    fn size(&self) -> u64 {
        self.entry.lock().data.len() as u64
    }

    fn seek(&mut self, pos: u64) -> Result<(), FsError> {
        if !self.open {
            return Err(FsError::NotOpen);
        }
        if pos > self.size() {
            return Err(FsError::InvalidSeek);
        }
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.open {
            return Err(FsError::NotOpen);
        }
        let entry = self.entry.lock();
        let start = (self.pos as usize).min(entry.data.len());
        let n = buf.len().min(entry.data.len() - start);
        buf[..n].copy_from_slice(&entry.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.open {
            return Err(FsError::NotOpen);
        }
        if !self.writable {
            return Err(FsError::PermissionDenied);
        }
        let mut entry = self.entry.lock();
        let start = self.pos as usize;
        if entry.data.len() < start + buf.len() {
            entry.data.resize(start + buf.len(), 0);
        }
        entry.data[start..start + buf.len()].copy_from_slice(buf);
        entry.writes += 1;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), FsError> {
        if !self.open {
            return Err(FsError::NotOpen);
        }
        self.entry.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), FsError> {
        if !self.open {
            return Err(FsError::NotOpen);
        }
        if self.entry.lock().fail_close {
            return Err(FsError::IoError);
        }
        self.open = false;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn contiguous_range(&self) -> Result<SectorRange, FsError> {
        self.entry.lock().range.ok_or(FsError::Fragmented)
    }
}
