//! Shared test doubles: a scriptable in-memory driver and a recording
//! protocol.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ftd2xx::{
    Device, DeviceInfo, DeviceInfoDetail, DeviceStatus, DeviceType, Driver, Error, FlowControl,
    ModemStatus, OpenBy, OpenOptions, Protocol, ProtocolError, RawHandle, Result, Status,
    Transport,
};

/// Scripted device behaviour and a log of the calls made.
#[derive(Default)]
pub struct MockState {
    /// Bytes waiting to be read.
    pub rx: VecDeque<u8>,
    /// Bytes accepted by `write`.
    pub written: Vec<u8>,
    /// Maximum bytes accepted per `write` call; `None` accepts everything.
    pub accept_per_write: Option<usize>,
    /// Feed written bytes back into `rx`.
    pub loopback: bool,
    /// Transmit queue depth reported by `status`.
    pub tx_queue: u32,
    /// Raw modem status word.
    pub modem: u32,
    pub fail_open: Option<Status>,
    pub fail_device_info: Option<Status>,
    pub fail_queue_status: Option<Status>,
    pub fail_read: Option<Status>,
    pub fail_write: Option<Status>,
    pub fail_purge: Option<Status>,
    pub close_count: usize,
    pub purges: Vec<u32>,
    pub timeouts: Vec<(u32, u32)>,
    pub read_calls: Vec<usize>,
    pub write_calls: usize,
    pub create_list_calls: usize,
    pub opened: Vec<String>,
    pub flow: Option<(FlowControl, u8, u8)>,
    pub devices: Vec<DeviceInfoDetail>,
    /// Pending event bits, cleared by `event_status`.
    pub events: u32,
    pub wait_mask: Option<u32>,
    pub com_port: i32,
    pub vid_pid: (u32, u32),
    pub port_calls: Vec<&'static str>,
}

/// In-memory [`Driver`] with a single device.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

fn fail(status: Option<Status>) -> Result<()> {
    match status {
        Some(status) => Err(Error::Device(status)),
        None => Ok(()),
    }
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn push_rx(&self, data: &[u8]) {
        self.state().rx.extend(data);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Open the mock device without refreshing the device list.
    pub fn open_device(self: &Arc<Self>) -> Device {
        OpenOptions::new()
            .update(false)
            .open_with(self.clone())
            .unwrap()
    }
}

impl Driver for MockDriver {
    fn create_device_info_list(&self) -> Result<u32> {
        let mut s = self.state();
        s.create_list_calls += 1;
        Ok(s.devices.len() as u32)
    }

    fn device_info_detail(&self, index: u32) -> Result<DeviceInfoDetail> {
        self.state()
            .devices
            .get(index as usize)
            .cloned()
            .ok_or(Error::Device(Status::DeviceNotFound))
    }

    fn open(&self, index: u32) -> Result<RawHandle> {
        let mut s = self.state();
        fail(s.fail_open)?;
        s.opened.push(format!("Index:{index}"));
        Ok(RawHandle::from_raw(0x1 as *mut c_void))
    }

    fn open_ex(&self, id: &[u8], by: OpenBy) -> Result<RawHandle> {
        let mut s = self.state();
        fail(s.fail_open)?;
        s.opened
            .push(format!("{by:?}:{}", String::from_utf8_lossy(id)));
        Ok(RawHandle::from_raw(0x1 as *mut c_void))
    }

    fn close(&self, _handle: RawHandle) -> Result<()> {
        self.state().close_count += 1;
        Ok(())
    }

    fn read(&self, _handle: RawHandle, buf: &mut [u8]) -> Result<usize> {
        let mut s = self.state();
        s.read_calls.push(buf.len());
        fail(s.fail_read)?;
        let n = s.rx.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(s.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&self, _handle: RawHandle, data: &[u8]) -> Result<usize> {
        let mut s = self.state();
        s.write_calls += 1;
        fail(s.fail_write)?;
        let n = s.accept_per_write.map_or(data.len(), |a| a.min(data.len()));
        s.written.extend_from_slice(&data[..n]);
        if s.loopback {
            s.rx.extend(&data[..n]);
        }
        Ok(n)
    }

    fn queue_status(&self, _handle: RawHandle) -> Result<u32> {
        let s = self.state();
        fail(s.fail_queue_status)?;
        Ok(s.rx.len() as u32)
    }

    fn status(&self, _handle: RawHandle) -> Result<DeviceStatus> {
        let s = self.state();
        Ok(DeviceStatus {
            rx_queue: s.rx.len() as u32,
            tx_queue: s.tx_queue,
            ..Default::default()
        })
    }

    fn set_timeouts(&self, _handle: RawHandle, read_ms: u32, write_ms: u32) -> Result<()> {
        self.state().timeouts.push((read_ms, write_ms));
        Ok(())
    }

    fn purge(&self, _handle: RawHandle, mask: u32) -> Result<()> {
        let mut s = self.state();
        s.purges.push(mask);
        fail(s.fail_purge)?;
        if mask & 1 != 0 {
            s.rx.clear();
        }
        Ok(())
    }

    fn device_info(&self, _handle: RawHandle) -> Result<DeviceInfo> {
        fail(self.state().fail_device_info)?;
        Ok(DeviceInfo {
            device_type: DeviceType::Ft232R,
            id: 0x0403_6001,
            serial_number: "MOCK0001".into(),
            description: "Mock UART".into(),
        })
    }

    fn set_flow_control(&self, _handle: RawHandle, flow: FlowControl, xon: u8, xoff: u8) -> Result<()> {
        self.state().flow = Some((flow, xon, xoff));
        Ok(())
    }

    fn modem_status(&self, _handle: RawHandle) -> Result<u32> {
        Ok(self.state().modem)
    }

    fn set_vid_pid(&self, vid: u32, pid: u32) -> Result<()> {
        self.state().vid_pid = (vid, pid);
        Ok(())
    }

    fn vid_pid(&self) -> Result<(u32, u32)> {
        Ok(self.state().vid_pid)
    }

    fn stop_in_task(&self, _handle: RawHandle) -> Result<()> {
        self.state().port_calls.push("stop_in_task");
        Ok(())
    }

    fn restart_in_task(&self, _handle: RawHandle) -> Result<()> {
        self.state().port_calls.push("restart_in_task");
        Ok(())
    }

    fn com_port_number(&self, _handle: RawHandle) -> Result<i32> {
        Ok(self.state().com_port)
    }

    fn set_wait_mask(&self, _handle: RawHandle, mask: u32) -> Result<()> {
        self.state().wait_mask = Some(mask);
        Ok(())
    }

    fn event_status(&self, _handle: RawHandle) -> Result<u32> {
        Ok(std::mem::take(&mut self.state().events))
    }
}

/// Protocol that records every callback.
#[derive(Default)]
pub struct Recorder {
    pub transport: RefCell<Option<Transport>>,
    pub made: Cell<usize>,
    pub received: RefCell<Vec<u8>>,
    pub chunks: Cell<usize>,
    pub lost: RefCell<Vec<Option<String>>>,
    pub pauses: Cell<usize>,
    pub resumes: Cell<usize>,
    pub modem: RefCell<Vec<ModemStatus>>,
    pub fail_pause: Cell<bool>,
    pub echo: Cell<bool>,
}

impl Protocol for Recorder {
    fn connection_made(&self, transport: &Transport) {
        self.made.set(self.made.get() + 1);
        *self.transport.borrow_mut() = Some(transport.clone());
    }

    fn data_received(&self, data: &[u8]) {
        self.received.borrow_mut().extend_from_slice(data);
        self.chunks.set(self.chunks.get() + 1);
        if self.echo.get() {
            if let Some(transport) = self.transport.borrow().as_ref() {
                transport.write(data);
            }
        }
    }

    fn connection_lost(&self, cause: Option<Error>) {
        self.lost.borrow_mut().push(cause.map(|e| e.to_string()));
        self.transport.borrow_mut().take();
    }

    fn pause_writing(&self) -> std::result::Result<(), ProtocolError> {
        self.pauses.set(self.pauses.get() + 1);
        if self.fail_pause.get() {
            return Err("consumer refused to pause".into());
        }
        Ok(())
    }

    fn resume_writing(&self) -> std::result::Result<(), ProtocolError> {
        self.resumes.set(self.resumes.get() + 1);
        Ok(())
    }

    fn modem_status_changed(&self, status: ModemStatus) {
        self.modem.borrow_mut().push(status);
    }
}

/// Let the pumps run for `ms` milliseconds of (paused) time.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
