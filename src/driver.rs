//! The native driver call surface.
//!
//! [`Driver`] describes the synchronous D2XX entry points this crate relies
//! on. Each method corresponds to exactly one native function; a non-success
//! status is reported as [`Error::Device`](crate::Error::Device).
//!
//! The production implementation is the dynamically loaded library returned
//! by [`library()`](crate::library::library). Other implementations (for
//! example in-memory test doubles) only need to provide the required methods;
//! everything else defaults to failing with [`Status::NotSupported`].
//!
//! Implementations must not be called concurrently for the same handle. The
//! [`Device`](crate::Device) wrapper guarantees this by requiring `&mut self`
//! for data transfers and by not being `Sync`.

use std::ffi::c_void;

use crate::device_info::{DeviceInfo, DeviceInfoDetail};
use crate::error::{Error, Result};
use crate::types::*;

/// An opaque native device handle (`FT_HANDLE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(*mut c_void);

// SAFETY: an FT_HANDLE is an opaque token owned by the driver. It may be used
// from any thread as long as calls on it are not concurrent, which `Device`
// enforces.
unsafe impl Send for RawHandle {}

impl RawHandle {
    /// Wrap a raw handle value.
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// The raw handle value.
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

fn not_supported<T>() -> Result<T> {
    Err(Error::Device(Status::NotSupported))
}

/// Synchronous D2XX entry points.
pub trait Driver: Send + Sync {
    // ---- Enumeration ----

    /// `FT_CreateDeviceInfoList`: rebuild the driver's device list (slow).
    fn create_device_info_list(&self) -> Result<u32> {
        not_supported()
    }

    /// `FT_GetDeviceInfoDetail`: read one entry of the device list.
    fn device_info_detail(&self, _index: u32) -> Result<DeviceInfoDetail> {
        not_supported()
    }

    /// `FT_GetLibraryVersion`.
    fn library_version(&self) -> Result<u32> {
        not_supported()
    }

    /// `FT_SetVIDPID`: add a custom VID/PID pair to the device table
    /// (Linux and macOS only).
    fn set_vid_pid(&self, _vid: u32, _pid: u32) -> Result<()> {
        not_supported()
    }

    /// `FT_GetVIDPID`: the custom VID/PID pair in the device table.
    fn vid_pid(&self) -> Result<(u32, u32)> {
        not_supported()
    }

    // ---- Open / close ----

    /// `FT_Open`: open a device by index.
    fn open(&self, index: u32) -> Result<RawHandle>;

    /// `FT_OpenEx` with a serial number or description.
    fn open_ex(&self, id: &[u8], by: OpenBy) -> Result<RawHandle>;

    /// `FT_OpenEx` with a location id.
    fn open_by_location(&self, _location: u32) -> Result<RawHandle> {
        not_supported()
    }

    /// `FT_Close`. Must be called at most once per handle.
    fn close(&self, handle: RawHandle) -> Result<()>;

    // ---- Data transfer ----

    /// `FT_Read`: returns the number of bytes stored in `buf`.
    fn read(&self, handle: RawHandle, buf: &mut [u8]) -> Result<usize>;

    /// `FT_Write`: returns the number of bytes accepted.
    fn write(&self, handle: RawHandle, data: &[u8]) -> Result<usize>;

    /// `FT_GetQueueStatus`: bytes available in the receive queue.
    fn queue_status(&self, handle: RawHandle) -> Result<u32>;

    /// `FT_GetStatus`: receive and transmit queue depths plus event bits.
    fn status(&self, handle: RawHandle) -> Result<DeviceStatus>;

    /// `FT_SetTimeouts` in milliseconds.
    fn set_timeouts(&self, handle: RawHandle, read_ms: u32, write_ms: u32) -> Result<()>;

    /// `FT_Purge`.
    fn purge(&self, handle: RawHandle, mask: u32) -> Result<()>;

    // ---- Line configuration ----

    /// `FT_SetBaudRate`.
    fn set_baud_rate(&self, _handle: RawHandle, _baud: u32) -> Result<()> {
        not_supported()
    }

    /// `FT_SetDivisor`.
    fn set_divisor(&self, _handle: RawHandle, _divisor: u16) -> Result<()> {
        not_supported()
    }

    /// `FT_SetDataCharacteristics`.
    fn set_data_characteristics(
        &self,
        _handle: RawHandle,
        _bits: DataBits,
        _stop_bits: StopBits,
        _parity: Parity,
    ) -> Result<()> {
        not_supported()
    }

    /// `FT_SetFlowControl`.
    fn set_flow_control(
        &self,
        _handle: RawHandle,
        _flow: FlowControl,
        _xon: u8,
        _xoff: u8,
    ) -> Result<()> {
        not_supported()
    }

    /// `FT_SetDtr` / `FT_ClrDtr`.
    fn set_dtr(&self, _handle: RawHandle, _state: bool) -> Result<()> {
        not_supported()
    }

    /// `FT_SetRts` / `FT_ClrRts`.
    fn set_rts(&self, _handle: RawHandle, _state: bool) -> Result<()> {
        not_supported()
    }

    /// `FT_GetModemStatus`.
    fn modem_status(&self, _handle: RawHandle) -> Result<u32> {
        not_supported()
    }

    /// `FT_SetChars`.
    fn set_chars(
        &self,
        _handle: RawHandle,
        _event: u8,
        _event_enable: bool,
        _error: u8,
        _error_enable: bool,
    ) -> Result<()> {
        not_supported()
    }

    /// `FT_SetBreakOn` / `FT_SetBreakOff`.
    fn set_break(&self, _handle: RawHandle, _on: bool) -> Result<()> {
        not_supported()
    }

    // ---- Device management ----

    /// `FT_ResetDevice`.
    fn reset_device(&self, _handle: RawHandle) -> Result<()> {
        not_supported()
    }

    /// `FT_GetDeviceInfo`.
    fn device_info(&self, handle: RawHandle) -> Result<DeviceInfo>;

    /// `FT_GetDriverVersion`.
    fn driver_version(&self, _handle: RawHandle) -> Result<u32> {
        not_supported()
    }

    /// `FT_SetLatencyTimer`.
    fn set_latency_timer(&self, _handle: RawHandle, _latency_ms: u8) -> Result<()> {
        not_supported()
    }

    /// `FT_GetLatencyTimer`.
    fn latency_timer(&self, _handle: RawHandle) -> Result<u8> {
        not_supported()
    }

    /// `FT_SetBitMode`.
    fn set_bit_mode(&self, _handle: RawHandle, _mask: u8, _mode: BitMode) -> Result<()> {
        not_supported()
    }

    /// `FT_GetBitMode`: instantaneous pin values.
    fn bit_mode(&self, _handle: RawHandle) -> Result<u8> {
        not_supported()
    }

    /// `FT_SetUSBParameters`.
    fn set_usb_parameters(&self, _handle: RawHandle, _in_size: u32, _out_size: u32) -> Result<()> {
        not_supported()
    }

    /// `FT_SetDeadmanTimeout`.
    fn set_deadman_timeout(&self, _handle: RawHandle, _timeout_ms: u32) -> Result<()> {
        not_supported()
    }

    /// `FT_ResetPort`: reset the upstream USB port (Windows only).
    fn reset_port(&self, _handle: RawHandle) -> Result<()> {
        not_supported()
    }

    /// `FT_CyclePort`: force a USB re-enumeration (Windows only).
    fn cycle_port(&self, _handle: RawHandle) -> Result<()> {
        not_supported()
    }

    /// `FT_StopInTask`: stop the driver's IN task.
    fn stop_in_task(&self, _handle: RawHandle) -> Result<()> {
        not_supported()
    }

    /// `FT_RestartInTask`.
    fn restart_in_task(&self, _handle: RawHandle) -> Result<()> {
        not_supported()
    }

    /// `FT_GetComPortNumber` (Windows only). Negative when no port is
    /// assigned.
    fn com_port_number(&self, _handle: RawHandle) -> Result<i32> {
        not_supported()
    }

    /// `FT_SetWaitMask`.
    fn set_wait_mask(&self, _handle: RawHandle, _mask: u32) -> Result<()> {
        not_supported()
    }

    /// `FT_GetEventStatus`: pending event bits, cleared by the read.
    fn event_status(&self, _handle: RawHandle) -> Result<u32> {
        not_supported()
    }
}
