//! Dynamically loaded D2XX library.
//!
//! The vendor library is loaded once per process, on first use, and is never
//! unloaded. Every [`Device`](crate::Device) opened through the default path
//! shares the same binding table.
//!
//! Set the `FTD2XX_LIBRARY` environment variable to the full path of the
//! shared library to override the platform default search.

use std::env;
use std::ffi::{c_char, c_int, c_void, CString};
use std::sync::{Arc, OnceLock};

use libloading::Library;

use crate::constants::MAX_DESCRIPTION_SIZE;
use crate::device_info::{DeviceInfo, DeviceInfoDetail};
use crate::driver::{Driver, RawHandle};
use crate::error::{Error, Result};
use crate::types::*;

/// Environment variable naming an explicit library path.
pub const LIBRARY_ENV: &str = "FTD2XX_LIBRARY";

#[cfg(windows)]
const DEFAULT_NAMES: &[&str] = &["ftd2xx64.dll", "ftd2xx.dll"];
#[cfg(target_os = "macos")]
const DEFAULT_NAMES: &[&str] = &["libftd2xx.dylib", "/usr/local/lib/libftd2xx.dylib"];
#[cfg(all(not(windows), not(target_os = "macos")))]
const DEFAULT_NAMES: &[&str] = &["libftd2xx.so"];

type FtStatus = u32;
type FtHandle = *mut c_void;
type Dword = u32;

type FnNoArgs = unsafe extern "system" fn(FtHandle) -> FtStatus;
type FnDwordOut = unsafe extern "system" fn(FtHandle, *mut Dword) -> FtStatus;
type FnDwordIn = unsafe extern "system" fn(FtHandle, Dword) -> FtStatus;
type FnByteIn = unsafe extern "system" fn(FtHandle, u8) -> FtStatus;
type FnByteOut = unsafe extern "system" fn(FtHandle, *mut u8) -> FtStatus;

/// Function pointers resolved from the vendor library.
#[allow(non_snake_case)]
struct Functions {
    FT_CreateDeviceInfoList: unsafe extern "system" fn(*mut Dword) -> FtStatus,
    FT_GetDeviceInfoDetail: unsafe extern "system" fn(
        Dword,
        *mut Dword,
        *mut Dword,
        *mut Dword,
        *mut Dword,
        *mut c_char,
        *mut c_char,
        *mut FtHandle,
    ) -> FtStatus,
    FT_GetLibraryVersion: unsafe extern "system" fn(*mut Dword) -> FtStatus,
    FT_Open: unsafe extern "system" fn(c_int, *mut FtHandle) -> FtStatus,
    FT_OpenEx: unsafe extern "system" fn(*mut c_void, Dword, *mut FtHandle) -> FtStatus,
    FT_Close: FnNoArgs,
    FT_Read: unsafe extern "system" fn(FtHandle, *mut c_void, Dword, *mut Dword) -> FtStatus,
    FT_Write: unsafe extern "system" fn(FtHandle, *const c_void, Dword, *mut Dword) -> FtStatus,
    FT_GetQueueStatus: FnDwordOut,
    FT_GetStatus: unsafe extern "system" fn(FtHandle, *mut Dword, *mut Dword, *mut Dword) -> FtStatus,
    FT_SetTimeouts: unsafe extern "system" fn(FtHandle, Dword, Dword) -> FtStatus,
    FT_Purge: FnDwordIn,
    FT_SetBaudRate: FnDwordIn,
    FT_SetDivisor: unsafe extern "system" fn(FtHandle, u16) -> FtStatus,
    FT_SetDataCharacteristics: unsafe extern "system" fn(FtHandle, u8, u8, u8) -> FtStatus,
    FT_SetFlowControl: unsafe extern "system" fn(FtHandle, u16, u8, u8) -> FtStatus,
    FT_SetDtr: FnNoArgs,
    FT_ClrDtr: FnNoArgs,
    FT_SetRts: FnNoArgs,
    FT_ClrRts: FnNoArgs,
    FT_GetModemStatus: FnDwordOut,
    FT_SetChars: unsafe extern "system" fn(FtHandle, u8, u8, u8, u8) -> FtStatus,
    FT_SetBreakOn: FnNoArgs,
    FT_SetBreakOff: FnNoArgs,
    FT_ResetDevice: FnNoArgs,
    FT_GetDeviceInfo: unsafe extern "system" fn(
        FtHandle,
        *mut Dword,
        *mut Dword,
        *mut c_char,
        *mut c_char,
        *mut c_void,
    ) -> FtStatus,
    // Extended entry points, absent from some older driver builds.
    FT_GetDriverVersion: Option<FnDwordOut>,
    FT_SetLatencyTimer: Option<FnByteIn>,
    FT_GetLatencyTimer: Option<FnByteOut>,
    FT_SetBitMode: Option<unsafe extern "system" fn(FtHandle, u8, u8) -> FtStatus>,
    FT_GetBitMode: Option<FnByteOut>,
    FT_SetUSBParameters: Option<unsafe extern "system" fn(FtHandle, Dword, Dword) -> FtStatus>,
    FT_SetDeadmanTimeout: Option<FnDwordIn>,
    FT_ResetPort: Option<FnNoArgs>,
    FT_CyclePort: Option<FnNoArgs>,
    FT_StopInTask: Option<FnNoArgs>,
    FT_RestartInTask: Option<FnNoArgs>,
    FT_SetWaitMask: Option<FnDwordIn>,
    FT_GetEventStatus: Option<FnDwordOut>,
    // Platform specific.
    FT_GetComPortNumber: Option<unsafe extern "system" fn(FtHandle, *mut i32) -> FtStatus>,
    FT_SetVIDPID: Option<unsafe extern "system" fn(Dword, Dword) -> FtStatus>,
    FT_GetVIDPID: Option<unsafe extern "system" fn(*mut Dword, *mut Dword) -> FtStatus>,
}

/// The loaded vendor library and its binding table.
pub struct D2xxLibrary {
    fns: Functions,
    // Must outlive `fns`; never dropped while the process-wide instance lives.
    _library: Library,
}

impl std::fmt::Debug for D2xxLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D2xxLibrary").finish_non_exhaustive()
    }
}

static LIBRARY: OnceLock<std::result::Result<Arc<D2xxLibrary>, String>> = OnceLock::new();

/// The process-wide D2XX binding table, loading it on first use.
///
/// A load failure is remembered: later calls report the same error without
/// retrying.
pub fn library() -> Result<Arc<dyn Driver>> {
    let loaded = LIBRARY.get_or_init(|| D2xxLibrary::load().map(Arc::new));
    match loaded {
        Ok(lib) => Ok(lib.clone() as Arc<dyn Driver>),
        Err(msg) => Err(Error::Library(msg.clone())),
    }
}

macro_rules! required {
    ($lib:expr, $name:ident) => {{
        let symbol = concat!(stringify!($name), "\0");
        // SAFETY: the declared signature matches the D2XX header.
        *unsafe { $lib.get(symbol.as_bytes()) }
            .map_err(|e| format!("missing symbol {}: {e}", stringify!($name)))?
    }};
}

macro_rules! optional {
    ($lib:expr, $name:ident) => {{
        let symbol = concat!(stringify!($name), "\0");
        // SAFETY: the declared signature matches the D2XX header.
        unsafe { $lib.get(symbol.as_bytes()) }.ok().map(|s| *s)
    }};
}

impl D2xxLibrary {
    fn load() -> std::result::Result<Self, String> {
        let library = open_library()?;
        let fns = Functions {
            FT_CreateDeviceInfoList: required!(library, FT_CreateDeviceInfoList),
            FT_GetDeviceInfoDetail: required!(library, FT_GetDeviceInfoDetail),
            FT_GetLibraryVersion: required!(library, FT_GetLibraryVersion),
            FT_Open: required!(library, FT_Open),
            FT_OpenEx: required!(library, FT_OpenEx),
            FT_Close: required!(library, FT_Close),
            FT_Read: required!(library, FT_Read),
            FT_Write: required!(library, FT_Write),
            FT_GetQueueStatus: required!(library, FT_GetQueueStatus),
            FT_GetStatus: required!(library, FT_GetStatus),
            FT_SetTimeouts: required!(library, FT_SetTimeouts),
            FT_Purge: required!(library, FT_Purge),
            FT_SetBaudRate: required!(library, FT_SetBaudRate),
            FT_SetDivisor: required!(library, FT_SetDivisor),
            FT_SetDataCharacteristics: required!(library, FT_SetDataCharacteristics),
            FT_SetFlowControl: required!(library, FT_SetFlowControl),
            FT_SetDtr: required!(library, FT_SetDtr),
            FT_ClrDtr: required!(library, FT_ClrDtr),
            FT_SetRts: required!(library, FT_SetRts),
            FT_ClrRts: required!(library, FT_ClrRts),
            FT_GetModemStatus: required!(library, FT_GetModemStatus),
            FT_SetChars: required!(library, FT_SetChars),
            FT_SetBreakOn: required!(library, FT_SetBreakOn),
            FT_SetBreakOff: required!(library, FT_SetBreakOff),
            FT_ResetDevice: required!(library, FT_ResetDevice),
            FT_GetDeviceInfo: required!(library, FT_GetDeviceInfo),
            FT_GetDriverVersion: optional!(library, FT_GetDriverVersion),
            FT_SetLatencyTimer: optional!(library, FT_SetLatencyTimer),
            FT_GetLatencyTimer: optional!(library, FT_GetLatencyTimer),
            FT_SetBitMode: optional!(library, FT_SetBitMode),
            FT_GetBitMode: optional!(library, FT_GetBitMode),
            FT_SetUSBParameters: optional!(library, FT_SetUSBParameters),
            FT_SetDeadmanTimeout: optional!(library, FT_SetDeadmanTimeout),
            FT_ResetPort: optional!(library, FT_ResetPort),
            FT_CyclePort: optional!(library, FT_CyclePort),
            FT_StopInTask: optional!(library, FT_StopInTask),
            FT_RestartInTask: optional!(library, FT_RestartInTask),
            FT_SetWaitMask: optional!(library, FT_SetWaitMask),
            FT_GetEventStatus: optional!(library, FT_GetEventStatus),
            FT_GetComPortNumber: optional!(library, FT_GetComPortNumber),
            FT_SetVIDPID: optional!(library, FT_SetVIDPID),
            FT_GetVIDPID: optional!(library, FT_GetVIDPID),
        };
        Ok(Self {
            fns,
            _library: library,
        })
    }
}

fn open_library() -> std::result::Result<Library, String> {
    if let Some(path) = env::var_os(LIBRARY_ENV) {
        log::debug!("loading D2XX library from {LIBRARY_ENV}={path:?}");
        // SAFETY: loading the vendor library runs its initialisers; nothing
        // else is required of the caller.
        return unsafe { Library::new(&path) }.map_err(|e| format!("{path:?}: {e}"));
    }

    let mut failures = Vec::new();
    for name in DEFAULT_NAMES {
        // SAFETY: as above.
        match unsafe { Library::new(name) } {
            Ok(library) => {
                log::debug!("loaded D2XX library {name}");
                return Ok(library);
            }
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }
    Err(failures.join("; "))
}

/// Translate a native status into a `Result`.
fn check(status: FtStatus) -> Result<()> {
    match Status::from_code(status) {
        None => Ok(()),
        Some(status) => Err(Error::Device(status)),
    }
}

fn c_buffer_to_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// NUL-terminate an open-by identifier, rejecting embedded NULs.
fn identifier(id: &[u8]) -> Result<CString> {
    CString::new(id).map_err(|_| Error::InvalidArgument("identifier contains a NUL byte"))
}

fn dword_len(len: usize) -> Result<Dword> {
    Dword::try_from(len).map_err(|_| Error::InvalidArgument("transfer larger than 4 GiB"))
}

fn optional_fn<F>(f: Option<F>) -> Result<F> {
    f.ok_or(Error::Device(Status::NotSupported))
}

impl Driver for D2xxLibrary {
    fn create_device_info_list(&self) -> Result<u32> {
        let mut count: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { (self.fns.FT_CreateDeviceInfoList)(&mut count) })?;
        Ok(count)
    }

    fn device_info_detail(&self, index: u32) -> Result<DeviceInfoDetail> {
        let mut flags: Dword = 0;
        let mut device_type: Dword = 0;
        let mut id: Dword = 0;
        let mut location: Dword = 0;
        let mut serial = [0 as c_char; MAX_DESCRIPTION_SIZE];
        let mut description = [0 as c_char; MAX_DESCRIPTION_SIZE];
        let mut handle: FtHandle = std::ptr::null_mut();
        // SAFETY: all out-pointers reference live locals; string buffers are
        // larger than the driver's documented maxima.
        check(unsafe {
            (self.fns.FT_GetDeviceInfoDetail)(
                index,
                &mut flags,
                &mut device_type,
                &mut id,
                &mut location,
                serial.as_mut_ptr(),
                description.as_mut_ptr(),
                &mut handle,
            )
        })?;
        Ok(DeviceInfoDetail {
            index,
            flags,
            device_type: DeviceType::from_raw(device_type),
            id,
            location,
            serial_number: c_buffer_to_string(&serial),
            description: c_buffer_to_string(&description),
        })
    }

    fn library_version(&self) -> Result<u32> {
        let mut version: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { (self.fns.FT_GetLibraryVersion)(&mut version) })?;
        Ok(version)
    }

    fn set_vid_pid(&self, vid: u32, pid: u32) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetVIDPID)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(vid, pid) })
    }

    fn vid_pid(&self) -> Result<(u32, u32)> {
        let f = optional_fn(self.fns.FT_GetVIDPID)?;
        let (mut vid, mut pid): (Dword, Dword) = (0, 0);
        // SAFETY: out-pointers to live locals.
        check(unsafe { f(&mut vid, &mut pid) })?;
        Ok((vid, pid))
    }

    fn open(&self, index: u32) -> Result<RawHandle> {
        let index = c_int::try_from(index).map_err(|_| Error::InvalidArgument("device index"))?;
        let mut handle: FtHandle = std::ptr::null_mut();
        // SAFETY: out-pointer to a live local.
        check(unsafe { (self.fns.FT_Open)(index, &mut handle) })?;
        Ok(RawHandle::from_raw(handle))
    }

    fn open_ex(&self, id: &[u8], by: OpenBy) -> Result<RawHandle> {
        if by == OpenBy::Location {
            return Err(Error::InvalidArgument("use open_by_location for location ids"));
        }
        let id = identifier(id)?;
        let mut handle: FtHandle = std::ptr::null_mut();
        // SAFETY: `id` is NUL-terminated and outlives the call.
        check(unsafe {
            (self.fns.FT_OpenEx)(id.as_ptr() as *mut c_void, by.wire_value(), &mut handle)
        })?;
        Ok(RawHandle::from_raw(handle))
    }

    #[cfg(windows)]
    fn open_by_location(&self, location: u32) -> Result<RawHandle> {
        let mut handle: FtHandle = std::ptr::null_mut();
        // SAFETY: FT_OpenEx takes the location id by value in the pointer slot.
        check(unsafe {
            (self.fns.FT_OpenEx)(
                location as usize as *mut c_void,
                OpenBy::Location.wire_value(),
                &mut handle,
            )
        })?;
        Ok(RawHandle::from_raw(handle))
    }

    fn close(&self, handle: RawHandle) -> Result<()> {
        // SAFETY: the caller guarantees the handle is open and closed once.
        check(unsafe { (self.fns.FT_Close)(handle.as_ptr()) })
    }

    fn read(&self, handle: RawHandle, buf: &mut [u8]) -> Result<usize> {
        let mut returned: Dword = 0;
        // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
        check(unsafe {
            (self.fns.FT_Read)(
                handle.as_ptr(),
                buf.as_mut_ptr() as *mut c_void,
                dword_len(buf.len())?,
                &mut returned,
            )
        })?;
        Ok((returned as usize).min(buf.len()))
    }

    fn write(&self, handle: RawHandle, data: &[u8]) -> Result<usize> {
        let mut written: Dword = 0;
        // SAFETY: `data` is valid for `data.len()` bytes of reads.
        check(unsafe {
            (self.fns.FT_Write)(
                handle.as_ptr(),
                data.as_ptr() as *const c_void,
                dword_len(data.len())?,
                &mut written,
            )
        })?;
        Ok(written as usize)
    }

    fn queue_status(&self, handle: RawHandle) -> Result<u32> {
        let mut amount: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { (self.fns.FT_GetQueueStatus)(handle.as_ptr(), &mut amount) })?;
        Ok(amount)
    }

    fn status(&self, handle: RawHandle) -> Result<DeviceStatus> {
        let (mut rx, mut tx, mut events): (Dword, Dword, Dword) = (0, 0, 0);
        // SAFETY: out-pointers to live locals.
        check(unsafe { (self.fns.FT_GetStatus)(handle.as_ptr(), &mut rx, &mut tx, &mut events) })?;
        Ok(DeviceStatus {
            rx_queue: rx,
            tx_queue: tx,
            events: EventFlags::from_raw(events),
        })
    }

    fn set_timeouts(&self, handle: RawHandle, read_ms: u32, write_ms: u32) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe { (self.fns.FT_SetTimeouts)(handle.as_ptr(), read_ms, write_ms) })
    }

    fn purge(&self, handle: RawHandle, mask: u32) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe { (self.fns.FT_Purge)(handle.as_ptr(), mask) })
    }

    fn set_baud_rate(&self, handle: RawHandle, baud: u32) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe { (self.fns.FT_SetBaudRate)(handle.as_ptr(), baud) })
    }

    fn set_divisor(&self, handle: RawHandle, divisor: u16) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe { (self.fns.FT_SetDivisor)(handle.as_ptr(), divisor) })
    }

    fn set_data_characteristics(
        &self,
        handle: RawHandle,
        bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe {
            (self.fns.FT_SetDataCharacteristics)(
                handle.as_ptr(),
                bits.wire_value(),
                stop_bits.wire_value(),
                parity.wire_value(),
            )
        })
    }

    fn set_flow_control(&self, handle: RawHandle, flow: FlowControl, xon: u8, xoff: u8) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe {
            (self.fns.FT_SetFlowControl)(handle.as_ptr(), flow.wire_value(), xon, xoff)
        })
    }

    fn set_dtr(&self, handle: RawHandle, state: bool) -> Result<()> {
        let f = if state { self.fns.FT_SetDtr } else { self.fns.FT_ClrDtr };
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn set_rts(&self, handle: RawHandle, state: bool) -> Result<()> {
        let f = if state { self.fns.FT_SetRts } else { self.fns.FT_ClrRts };
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn modem_status(&self, handle: RawHandle) -> Result<u32> {
        let mut status: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { (self.fns.FT_GetModemStatus)(handle.as_ptr(), &mut status) })?;
        Ok(status)
    }

    fn set_chars(
        &self,
        handle: RawHandle,
        event: u8,
        event_enable: bool,
        error: u8,
        error_enable: bool,
    ) -> Result<()> {
        // SAFETY: plain value arguments.
        check(unsafe {
            (self.fns.FT_SetChars)(
                handle.as_ptr(),
                event,
                event_enable as u8,
                error,
                error_enable as u8,
            )
        })
    }

    fn set_break(&self, handle: RawHandle, on: bool) -> Result<()> {
        let f = if on {
            self.fns.FT_SetBreakOn
        } else {
            self.fns.FT_SetBreakOff
        };
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn reset_device(&self, handle: RawHandle) -> Result<()> {
        // SAFETY: handle-only call.
        check(unsafe { (self.fns.FT_ResetDevice)(handle.as_ptr()) })
    }

    fn device_info(&self, handle: RawHandle) -> Result<DeviceInfo> {
        let mut device_type: Dword = 0;
        let mut id: Dword = 0;
        let mut serial = [0 as c_char; MAX_DESCRIPTION_SIZE];
        let mut description = [0 as c_char; MAX_DESCRIPTION_SIZE];
        // SAFETY: out-pointers reference live locals; the reserved argument
        // must be NULL.
        check(unsafe {
            (self.fns.FT_GetDeviceInfo)(
                handle.as_ptr(),
                &mut device_type,
                &mut id,
                serial.as_mut_ptr(),
                description.as_mut_ptr(),
                std::ptr::null_mut(),
            )
        })?;
        Ok(DeviceInfo {
            device_type: DeviceType::from_raw(device_type),
            id,
            serial_number: c_buffer_to_string(&serial),
            description: c_buffer_to_string(&description),
        })
    }

    fn driver_version(&self, handle: RawHandle) -> Result<u32> {
        let f = optional_fn(self.fns.FT_GetDriverVersion)?;
        let mut version: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { f(handle.as_ptr(), &mut version) })?;
        Ok(version)
    }

    fn set_latency_timer(&self, handle: RawHandle, latency_ms: u8) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetLatencyTimer)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(handle.as_ptr(), latency_ms) })
    }

    fn latency_timer(&self, handle: RawHandle) -> Result<u8> {
        let f = optional_fn(self.fns.FT_GetLatencyTimer)?;
        let mut latency = 0u8;
        // SAFETY: out-pointer to a live local.
        check(unsafe { f(handle.as_ptr(), &mut latency) })?;
        Ok(latency)
    }

    fn set_bit_mode(&self, handle: RawHandle, mask: u8, mode: BitMode) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetBitMode)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(handle.as_ptr(), mask, mode.wire_value()) })
    }

    fn bit_mode(&self, handle: RawHandle) -> Result<u8> {
        let f = optional_fn(self.fns.FT_GetBitMode)?;
        let mut pins = 0u8;
        // SAFETY: out-pointer to a live local.
        check(unsafe { f(handle.as_ptr(), &mut pins) })?;
        Ok(pins)
    }

    fn set_usb_parameters(&self, handle: RawHandle, in_size: u32, out_size: u32) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetUSBParameters)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(handle.as_ptr(), in_size, out_size) })
    }

    fn set_deadman_timeout(&self, handle: RawHandle, timeout_ms: u32) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetDeadmanTimeout)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(handle.as_ptr(), timeout_ms) })
    }

    fn reset_port(&self, handle: RawHandle) -> Result<()> {
        let f = optional_fn(self.fns.FT_ResetPort)?;
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn cycle_port(&self, handle: RawHandle) -> Result<()> {
        let f = optional_fn(self.fns.FT_CyclePort)?;
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn stop_in_task(&self, handle: RawHandle) -> Result<()> {
        let f = optional_fn(self.fns.FT_StopInTask)?;
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn restart_in_task(&self, handle: RawHandle) -> Result<()> {
        let f = optional_fn(self.fns.FT_RestartInTask)?;
        // SAFETY: handle-only call.
        check(unsafe { f(handle.as_ptr()) })
    }

    fn com_port_number(&self, handle: RawHandle) -> Result<i32> {
        let f = optional_fn(self.fns.FT_GetComPortNumber)?;
        let mut port: i32 = -1;
        // SAFETY: out-pointer to a live local.
        check(unsafe { f(handle.as_ptr(), &mut port) })?;
        Ok(port)
    }

    fn set_wait_mask(&self, handle: RawHandle, mask: u32) -> Result<()> {
        let f = optional_fn(self.fns.FT_SetWaitMask)?;
        // SAFETY: plain value arguments.
        check(unsafe { f(handle.as_ptr(), mask) })
    }

    fn event_status(&self, handle: RawHandle) -> Result<u32> {
        let f = optional_fn(self.fns.FT_GetEventStatus)?;
        let mut events: Dword = 0;
        // SAFETY: out-pointer to a live local.
        check(unsafe { f(handle.as_ptr(), &mut events) })?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_maps_status_codes() {
        assert!(check(0).is_ok());
        match check(2) {
            Err(Error::Device(Status::DeviceNotFound)) => {}
            other => panic!("expected DeviceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn c_strings_stop_at_nul() {
        let mut buf = [0 as c_char; 16];
        for (dst, src) in buf.iter_mut().zip(b"FT12AB\0junk") {
            *dst = *src as c_char;
        }
        assert_eq!(c_buffer_to_string(&buf), "FT12AB");
    }

    #[test]
    fn identifiers_with_embedded_nul_are_rejected() {
        assert!(matches!(
            identifier(b"FT12\0XYZ"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(identifier(b"FT12\0"), Err(Error::InvalidArgument(_))));
        assert_eq!(identifier(b"FT12XYZ").unwrap().as_bytes_with_nul(), b"FT12XYZ\0");
        assert_eq!(identifier(b"").unwrap().as_bytes_with_nul(), b"\0");
    }
}
