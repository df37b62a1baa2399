use crate::hal::block_device::BlockDevice;
use crate::hal::rom_drive::RomDrive;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

/// Registry name of the SD card holding image files
pub const SD_CARD: &str = "sd0";

/// Registry name of the onboard flash ROM drive
pub const ROM_DRIVE: &str = "rom0";

/// Device types that can be managed
#[derive(Clone)]
pub enum Device {
    Block(Arc<dyn BlockDevice>),
    Rom(Arc<dyn RomDrive>),
}

impl Device {
    /// Create a block device from any BlockDevice implementation
    pub fn new_block<T: BlockDevice + 'static>(block: T) -> Self {
        Device::Block(Arc::new(block))
    }

    /// Create a ROM drive from any RomDrive implementation
    pub fn new_rom<T: RomDrive + 'static>(rom: T) -> Self {
        Device::Rom(Arc::new(rom))
    }
}

/// Owns every storage device in the system
///
/// Consumers get shared handles; replacing a device in the registry does
/// not invalidate handles already handed out.
pub struct DeviceManager {
    devices: BTreeMap<String, Device>,
}

impl DeviceManager {
    pub const fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: String, device: Device) {
        log::debug!("Registering storage device {}", name);
        self.devices.insert(name, device);
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn block(&self, name: &str) -> Option<Arc<dyn BlockDevice>> {
        match self.get(name)? {
            Device::Block(block) => Some(block.clone()),
            _ => None,
        }
    }

    pub fn rom(&self, name: &str) -> Option<Arc<dyn RomDrive>> {
        match self.get(name)? {
            Device::Rom(rom) => Some(rom.clone()),
            _ => None,
        }
    }

    pub fn sd_card(&self) -> Option<Arc<dyn BlockDevice>> {
        self.block(SD_CARD)
    }

    pub fn rom_drive(&self) -> Option<Arc<dyn RomDrive>> {
        self.rom(ROM_DRIVE)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

static DEVICE_MANAGER: Mutex<DeviceManager> = Mutex::new(DeviceManager::new());

pub fn devices() -> &'static Mutex<DeviceManager> {
    &DEVICE_MANAGER
}
