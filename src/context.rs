//! Core D2XX device handle and operations.
//!
//! [`Device`] is the main type in this crate. It owns one open native handle
//! and exposes the synchronous driver operations on it: data transfer, queue
//! and status queries, line configuration and device management.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::device_info::{DeviceInfo, DeviceSelector};
use crate::driver::{Driver, RawHandle};
use crate::error::{Error, Result};
use crate::library::library;
use crate::types::*;

/// An opened D2XX device.
///
/// The native handle is released exactly once: by [`close`](Self::close) or
/// when the `Device` is dropped. After closing, every operation fails with
/// [`Status::DeviceNotOpened`] without reaching the driver.
///
/// # Opening a device
///
/// ```no_run
/// use ftd2xx::Device;
///
/// let mut dev = Device::open(0)?;
/// dev.set_baud_rate(115200)?;
/// dev.write(b"Hello FTDI!\r\n")?;
/// # Ok::<(), ftd2xx::Error>(())
/// ```
///
/// # Implements `Read` and `Write`
///
/// `Device` implements [`std::io::Read`] and [`std::io::Write`], so you can
/// use it anywhere those traits are expected.
pub struct Device {
    driver: Arc<dyn Driver>,
    handle: Option<RawHandle>,
    info: DeviceInfo,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("info", &self.info)
            .field("open", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

// ---- Construction / Opening ----

impl Device {
    /// Open the device at `index` in the driver's device list.
    ///
    /// The device list is rebuilt first. Use [`OpenOptions`](crate::OpenOptions)
    /// to skip that step.
    pub fn open(index: u32) -> Result<Self> {
        Self::open_with(library()?, &DeviceSelector::Index(index), true)
    }

    /// Open a device by serial number, description or location.
    pub fn open_ex(id: impl AsRef<[u8]>, by: OpenBy) -> Result<Self> {
        let selector = match by {
            OpenBy::SerialNumber => DeviceSelector::SerialNumber(id.as_ref().to_vec()),
            OpenBy::Description => DeviceSelector::Description(id.as_ref().to_vec()),
            OpenBy::Location => {
                let text = std::str::from_utf8(id.as_ref())
                    .map_err(|_| Error::InvalidArgument("location id must be numeric"))?;
                let location = text
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidArgument("location id must be numeric"))?;
                DeviceSelector::Location(location)
            }
        };
        Self::open_with(library()?, &selector, true)
    }

    /// Open a device through an explicit driver.
    ///
    /// When `update` is set the driver's device list is rebuilt before
    /// opening. The descriptor is read once here; a failure to read it closes
    /// the fresh handle again.
    pub fn open_with(driver: Arc<dyn Driver>, selector: &DeviceSelector, update: bool) -> Result<Self> {
        if update {
            driver.create_device_info_list()?;
        }
        let handle = match selector {
            DeviceSelector::Index(index) => driver.open(*index)?,
            DeviceSelector::SerialNumber(serial) => driver.open_ex(serial, OpenBy::SerialNumber)?,
            DeviceSelector::Description(desc) => driver.open_ex(desc, OpenBy::Description)?,
            DeviceSelector::Location(location) => driver.open_by_location(*location)?,
        };

        let info = match driver.device_info(handle) {
            Ok(info) => info,
            Err(e) => {
                if let Err(close_err) = driver.close(handle) {
                    log::warn!("failed to close handle after descriptor error: {close_err}");
                }
                return Err(e);
            }
        };

        log::debug!(
            "opened {:?} {:?} ({}) via {selector:?}",
            info.device_type,
            info.description,
            info.serial_number
        );

        Ok(Self {
            driver,
            handle: Some(handle),
            info,
        })
    }

    /// The descriptor read when the device was opened.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Re-query the descriptor from the driver.
    pub fn refresh_info(&mut self) -> Result<&DeviceInfo> {
        let handle = self.handle()?;
        self.info = self.driver.device_info(handle)?;
        Ok(&self.info)
    }

    /// Whether the native handle is still open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the native handle.
    ///
    /// Closing an already closed device does nothing. The handle is
    /// considered released even if the driver reports an error.
    pub fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                log::debug!("closing {:?}", self.info.description);
                self.driver.close(handle)
            }
            None => Ok(()),
        }
    }

    fn handle(&self) -> Result<RawHandle> {
        self.handle.ok_or(Error::Device(Status::DeviceNotOpened))
    }
}

// ---- Data Transfer ----

impl Device {
    /// Read up to `max` bytes.
    ///
    /// Blocks according to the native timeouts; may return fewer bytes.
    pub fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        let n = self.read_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read into `buf`, returning the number of bytes stored.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle()?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.driver.read(handle, buf)
    }

    /// Write `data`, returning the number of bytes the device accepted.
    ///
    /// A partial write is not retried.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let handle = self.handle()?;
        self.driver.write(handle, data)
    }

    /// Bytes waiting in the receive queue.
    pub fn queue_status(&self) -> Result<usize> {
        let handle = self.handle()?;
        Ok(self.driver.queue_status(handle)? as usize)
    }

    /// Receive/transmit queue depths and pending events.
    pub fn status(&self) -> Result<DeviceStatus> {
        let handle = self.handle()?;
        self.driver.status(handle)
    }

    /// Discard the contents of the selected driver buffers.
    pub fn purge(&mut self, which: Purge) -> Result<()> {
        let handle = self.handle()?;
        self.driver.purge(handle, which.mask())
    }

    /// Set the native read and write timeouts.
    ///
    /// Values are sent in whole milliseconds, saturating at `u32::MAX`.
    pub fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<()> {
        self.set_timeouts_ms(duration_ms(read), duration_ms(write))
    }

    /// Set the native read and write timeouts in milliseconds.
    pub fn set_timeouts_ms(&mut self, read_ms: u32, write_ms: u32) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_timeouts(handle, read_ms, write_ms)
    }
}

fn duration_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

// ---- Serial Configuration ----

impl Device {
    /// Set the baud rate.
    pub fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_baud_rate(handle, baud)
    }

    /// Set a non-standard baud rate through the raw clock divisor.
    pub fn set_divisor(&mut self, divisor: u16) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_divisor(handle, divisor)
    }

    /// Set word length, stop bits and parity.
    pub fn set_data_characteristics(
        &mut self,
        bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Result<()> {
        let handle = self.handle()?;
        self.driver
            .set_data_characteristics(handle, bits, stop_bits, parity)
    }

    /// Set the event and error characters.
    pub fn set_chars(
        &mut self,
        event: u8,
        event_enable: bool,
        error: u8,
        error_enable: bool,
    ) -> Result<()> {
        let handle = self.handle()?;
        self.driver
            .set_chars(handle, event, event_enable, error, error_enable)
    }

    /// Assert or release a break condition.
    pub fn set_break(&mut self, on: bool) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_break(handle, on)
    }
}

// ---- Flow Control / Modem Lines ----

impl Device {
    /// Configure flow control.
    ///
    /// [`FlowControl::XonXoff`] needs both `xon` and `xoff`; the other modes
    /// ignore them.
    pub fn set_flow_control(
        &mut self,
        flow: FlowControl,
        xon: Option<u8>,
        xoff: Option<u8>,
    ) -> Result<()> {
        let (xon, xoff) = match (flow, xon, xoff) {
            (FlowControl::XonXoff, Some(on), Some(off)) => (on, off),
            (FlowControl::XonXoff, _, _) => {
                return Err(Error::InvalidArgument(
                    "XON/XOFF flow control requires both control characters",
                ))
            }
            (_, on, off) => (on.unwrap_or(0), off.unwrap_or(0)),
        };
        let handle = self.handle()?;
        self.driver.set_flow_control(handle, flow, xon, xoff)
    }

    /// Set or clear the DTR line.
    pub fn set_dtr(&mut self, state: bool) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_dtr(handle, state)
    }

    /// Set or clear the RTS line.
    pub fn set_rts(&mut self, state: bool) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_rts(handle, state)
    }

    /// Current modem and line status.
    pub fn modem_status(&self) -> Result<ModemStatus> {
        let handle = self.handle()?;
        Ok(ModemStatus::from_raw(self.driver.modem_status(handle)?))
    }
}

// ---- Device Management ----

impl Device {
    /// Send a reset command to the device.
    pub fn reset_device(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.driver.reset_device(handle)
    }

    /// Version of the kernel driver, encoded as `0x00MMmmbb`.
    pub fn driver_version(&self) -> Result<u32> {
        let handle = self.handle()?;
        self.driver.driver_version(handle)
    }

    /// Set the latency timer (1-255 ms).
    pub fn set_latency_timer(&mut self, latency_ms: u8) -> Result<()> {
        if latency_ms == 0 {
            return Err(Error::InvalidArgument("latency must be 1-255"));
        }
        let handle = self.handle()?;
        self.driver.set_latency_timer(handle, latency_ms)
    }

    /// Current latency timer value in milliseconds.
    pub fn latency_timer(&self) -> Result<u8> {
        let handle = self.handle()?;
        self.driver.latency_timer(handle)
    }

    /// Select a bit mode. `mask` sets pin directions (1 = output).
    pub fn set_bit_mode(&mut self, mask: u8, mode: BitMode) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_bit_mode(handle, mask, mode)
    }

    /// Instantaneous value of the data bus pins.
    pub fn bit_mode(&self) -> Result<u8> {
        let handle = self.handle()?;
        self.driver.bit_mode(handle)
    }

    /// Set the USB request transfer sizes.
    pub fn set_usb_parameters(&mut self, in_size: u32, out_size: u32) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_usb_parameters(handle, in_size, out_size)
    }

    /// Set the deadman timeout.
    pub fn set_deadman_timeout(&mut self, timeout: Duration) -> Result<()> {
        let handle = self.handle()?;
        self.driver
            .set_deadman_timeout(handle, duration_ms(timeout))
    }

    /// Reset the USB port the device is attached to (Windows only).
    pub fn reset_port(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.driver.reset_port(handle)
    }

    /// Force the device to re-enumerate (Windows only).
    ///
    /// The handle should be closed afterwards and the device reopened once
    /// it reappears.
    pub fn cycle_port(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.driver.cycle_port(handle)
    }

    /// Stop the driver from polling the device for received data.
    pub fn stop_in_task(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.driver.stop_in_task(handle)
    }

    /// Undo [`stop_in_task`](Self::stop_in_task).
    pub fn restart_in_task(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.driver.restart_in_task(handle)
    }

    /// COM port assigned to the device (Windows only), `None` if there is
    /// none.
    pub fn com_port_number(&self) -> Result<Option<u32>> {
        let handle = self.handle()?;
        Ok(u32::try_from(self.driver.com_port_number(handle)?).ok())
    }
}

// ---- Events ----

impl Device {
    /// Select the events reported by [`event_status`](Self::event_status).
    pub fn set_wait_mask(&mut self, mask: EventFlags) -> Result<()> {
        let handle = self.handle()?;
        self.driver.set_wait_mask(handle, mask.raw())
    }

    /// Pending events. Reading clears them in the driver.
    pub fn event_status(&mut self) -> Result<EventFlags> {
        let handle = self.handle()?;
        Ok(EventFlags::from_raw(self.driver.event_status(handle)?))
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close device on drop: {e}");
        }
    }
}

// ---- std::io trait implementations ----

impl io::Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::other)
    }
}

impl io::Write for Device {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Device::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
