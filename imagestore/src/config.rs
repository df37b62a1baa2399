//! Configuration lookup
//!
//! Drive settings come from an INI file on the SD card. Only a handful of
//! keys matter to the storage layer, so the reader keeps every entry as text
//! and converts on lookup.
//!
//! ```text
//! [SCSI]
//! ; Expose the whole FAT allocation of contiguous images
//! UseFATAllocSize = 1
//! ```

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::fs::{FileSystem, FsError, ImageFile, OpenFlags};

/// Default configuration file name in the SD card root
pub const CONFIG_FILE: &str = "zuluscsi.ini";

/// Largest configuration file that will be read
pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Section holding the SCSI bus settings
pub const SCSI_SECTION: &str = "SCSI";

/// Report the full FAT allocation of a contiguous image as the drive size
///
/// Firmware 1.0.8 and 1.0.9 exposed the size of the cluster allocation
/// instead of the file size. Drives formatted under those versions need this
/// set to keep seeing the same capacity.
pub const USE_FAT_ALLOC_SIZE: &str = "UseFATAllocSize";

/// Configuration values by section and key
pub trait ConfigSource {
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}

/// Configuration that always answers with the default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfig;

impl ConfigSource for NoConfig {
    fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
        default
    }
}

#[derive(Debug, Clone)]
struct Entry {
    section: String,
    key: String,
    value: String,
}

/// Parsed INI file
///
/// Section and key names match case-insensitively. Later duplicates of a key
/// are ignored, as the first match wins.
#[derive(Debug, Clone, Default)]
pub struct IniConfig {
    entries: Vec<Entry>,
}

impl IniConfig {
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut section = String::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                if let Some(end) = rest.find(']') {
                    section = String::from(rest[..end].trim());
                } else {
                    log::warn!("Config: unterminated section header: {}", line);
                }
                continue;
            }

            let Some((key, value)) = line.split_once(['=', ':']) else {
                log::warn!("Config: ignoring line without value: {}", line);
                continue;
            };

            entries.push(Entry {
                section: section.clone(),
                key: String::from(key.trim()),
                value: String::from(strip_comment(value).trim()),
            });
        }

        Self { entries }
    }

    /// Read and parse `path` from `fs`
    ///
    /// A missing or unreadable file gives an empty configuration, so every
    /// lookup falls back to its default.
    pub fn load(fs: &dyn FileSystem, path: &str) -> Self {
        let mut file = match fs.open(path, OpenFlags::READ) {
            Ok(file) => file,
            Err(e) => {
                log::debug!("Config file {} not loaded: {}", path, e);
                return Self::default();
            }
        };

        let size = file.size();
        let text = if size > MAX_CONFIG_SIZE {
            log::warn!("Config file {} is {} bytes, limit is {}", path, size, MAX_CONFIG_SIZE);
            None
        } else {
            read_all(&mut *file, size as usize)
                .map_err(|e| log::warn!("Config file {} read failed: {}", path, e))
                .ok()
        };

        if let Err(e) = file.close() {
            log::debug!("Closing config file {} failed: {}", path, e);
        }

        let Some(text) = text else {
            return Self::default();
        };
        Self::parse(&String::from_utf8_lossy(&text))
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.section.eq_ignore_ascii_case(section) && e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_str())
    }

}

impl ConfigSource for IniConfig {
    /// Values starting with `1`, `Y` or `T` are true, `0`, `N` or `F` false;
    /// anything else gives `default`.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_str(section, key).and_then(|v| v.chars().next()) {
            Some('1' | 'y' | 'Y' | 't' | 'T') => true,
            Some('0' | 'n' | 'N' | 'f' | 'F') => false,
            _ => default,
        }
    }
}

fn strip_comment(value: &str) -> &str {
    match value.find(';') {
        Some(idx) => &value[..idx],
        None => value,
    }
}

fn read_all(file: &mut dyn ImageFile, size: usize) -> Result<Vec<u8>, FsError> {
    let mut text = vec![0u8; size];
    let mut filled = 0;
    while filled < text.len() {
        match file.read(&mut text[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    text.truncate(filled);
    Ok(text)
}
