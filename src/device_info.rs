//! Device discovery, enumeration and open options.
//!
//! Use [`list_devices`] to list the devices known to the driver, or
//! [`OpenOptions`] to select and open one by index, serial number,
//! description or location.

use std::sync::Arc;

use crate::context::Device;
use crate::driver::Driver;
use crate::error::Result;
use crate::library::library;
use crate::types::DeviceType;

/// Descriptor of an open device, as reported by `FT_GetDeviceInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Chip family.
    pub device_type: DeviceType,
    /// Combined id: vendor id in the high word, product id in the low word.
    pub id: u32,
    /// USB serial number string.
    pub serial_number: String,
    /// USB product description string.
    pub description: String,
}

impl DeviceInfo {
    /// USB vendor id.
    pub fn vendor_id(&self) -> u16 {
        (self.id >> 16) as u16
    }

    /// USB product id.
    pub fn product_id(&self) -> u16 {
        (self.id & 0xFFFF) as u16
    }
}

/// One entry of the driver's device list (`FT_GetDeviceInfoDetail`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfoDetail {
    /// Position in the device list.
    pub index: u32,
    /// Raw flag word.
    pub flags: u32,
    /// Chip family.
    pub device_type: DeviceType,
    /// Combined vendor/product id.
    pub id: u32,
    /// Location id.
    pub location: u32,
    /// USB serial number string.
    pub serial_number: String,
    /// USB product description string.
    pub description: String,
}

impl DeviceInfoDetail {
    /// The device is currently opened by some process.
    pub fn is_open(&self) -> bool {
        self.flags & 0x1 != 0
    }

    /// The device is enumerated as a high-speed USB device.
    pub fn is_high_speed(&self) -> bool {
        self.flags & 0x2 != 0
    }

    /// USB vendor id.
    pub fn vendor_id(&self) -> u16 {
        (self.id >> 16) as u16
    }

    /// USB product id.
    pub fn product_id(&self) -> u16 {
        (self.id & 0xFFFF) as u16
    }
}

/// Which device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Position in the driver's device list.
    Index(u32),
    /// USB serial number.
    SerialNumber(Vec<u8>),
    /// USB product description.
    Description(Vec<u8>),
    /// Location id. The native driver only honours this on Windows.
    Location(u32),
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Options for opening a device.
///
/// By default the first device in the list is opened, after the driver's
/// device list has been rebuilt.
///
/// # Example
///
/// ```no_run
/// use ftd2xx::OpenOptions;
///
/// let dev = OpenOptions::new().serial_number("FT12AB34").open()?;
/// println!("{}", dev.info().description);
/// # Ok::<(), ftd2xx::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Device to open.
    pub selector: DeviceSelector,
    /// Rebuild the driver's device list before opening. Defaults to `true`.
    pub update: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    /// Open the first device, refreshing the device list first.
    pub fn new() -> Self {
        Self {
            selector: DeviceSelector::default(),
            update: true,
        }
    }

    /// Select the device at `index` in the device list.
    pub fn index(mut self, index: u32) -> Self {
        self.selector = DeviceSelector::Index(index);
        self
    }

    /// Select the device with this serial number.
    pub fn serial_number(mut self, serial: impl Into<Vec<u8>>) -> Self {
        self.selector = DeviceSelector::SerialNumber(serial.into());
        self
    }

    /// Select the device with this product description.
    pub fn description(mut self, description: impl Into<Vec<u8>>) -> Self {
        self.selector = DeviceSelector::Description(description.into());
        self
    }

    /// Select the device at this location id.
    pub fn location(mut self, location: u32) -> Self {
        self.selector = DeviceSelector::Location(location);
        self
    }

    /// Whether to rebuild the driver's device list before opening.
    ///
    /// Rebuilding is slow; pass `false` when the list is known to be current.
    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Open the selected device through the process-wide D2XX library.
    pub fn open(&self) -> Result<Device> {
        self.open_with(library()?)
    }

    /// Open the selected device through an explicit driver.
    pub fn open_with(&self, driver: Arc<dyn Driver>) -> Result<Device> {
        Device::open_with(driver, &self.selector, self.update)
    }
}

/// Rebuild the driver's device list and return the number of devices.
pub fn create_device_info_list() -> Result<u32> {
    library()?.create_device_info_list()
}

/// Number of connected devices.
pub fn device_count() -> Result<u32> {
    create_device_info_list()
}

/// Read one entry of the device list, optionally rebuilding the list first.
pub fn device_info_detail(index: u32, update: bool) -> Result<DeviceInfoDetail> {
    let driver = library()?;
    if update {
        driver.create_device_info_list()?;
    }
    driver.device_info_detail(index)
}

/// Version of the D2XX library, encoded as `0x00MMmmbb`.
pub fn library_version() -> Result<u32> {
    library()?.library_version()
}

/// Add a custom VID/PID pair to the driver's device table so that devices
/// with a non-FTDI product id can be opened (Linux and macOS only).
///
/// Must be called before the device list is built.
pub fn set_vid_pid(vid: u16, pid: u16) -> Result<()> {
    library()?.set_vid_pid(u32::from(vid), u32::from(pid))
}

/// The custom VID/PID pair in the driver's device table (Linux and macOS
/// only).
pub fn vid_pid() -> Result<(u32, u32)> {
    library()?.vid_pid()
}

/// List all devices known to the process-wide D2XX library.
///
/// # Example
///
/// ```no_run
/// for dev in ftd2xx::list_devices()? {
///     println!("{}: {} ({})", dev.index, dev.description, dev.serial_number);
/// }
/// # Ok::<(), ftd2xx::Error>(())
/// ```
pub fn list_devices() -> Result<Vec<DeviceInfoDetail>> {
    list_devices_with(library()?.as_ref())
}

/// List all devices known to `driver`.
pub fn list_devices_with(driver: &dyn Driver) -> Result<Vec<DeviceInfoDetail>> {
    let count = driver.create_device_info_list()?;
    (0..count).map(|i| driver.device_info_detail(i)).collect()
}
