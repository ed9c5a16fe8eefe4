//! Event-driven transport over a [`Device`].
//!
//! A [`Transport`] pairs an open device with a consumer implementing
//! [`Protocol`]. Two independently scheduled pumps run on the current tokio
//! [`LocalSet`](tokio::task::LocalSet):
//!
//! - the read pump polls the receive queue and hands received bytes to
//!   [`Protocol::data_received`], alongside a modem-status poller that reports
//!   line changes through [`Protocol::modem_status_changed`];
//! - the write pump drains the outbound buffer into the device whenever the
//!   device transmit queue has room, signalling backpressure through
//!   [`Protocol::pause_writing`] / [`Protocol::resume_writing`].
//!
//! The driver offers no readiness notification, so both pumps poll at
//! [`TransportConfig::poll_interval`]. All native calls made by the pumps are
//! configured to return immediately, so a pump never stalls the scheduler.
//!
//! # Shutdown
//!
//! [`close`](Transport::close) stops reading and lets the write pump drain
//! the outbound buffer before the connection is torn down.
//! [`abort`](Transport::abort) tears it down immediately, discarding pending
//! output. A device error inside a pump is fatal: the device buffers are
//! purged and the consumer sees the error in
//! [`Protocol::connection_lost`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::context::Device;
use crate::error::{Error, Result};
use crate::types::{ModemStatus, Purge, Status};

/// Default interval between pump cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Default maximum number of bytes taken from the device per read cycle.
pub const DEFAULT_MAX_READ_SIZE: usize = 1024;

/// Default limit on bytes waiting in the device transmit queue before the
/// write pump holds off.
pub const DEFAULT_MAX_OUT_WAITING: usize = 1024;

/// Default high-water mark of the outbound buffer.
pub const DEFAULT_HIGH_WATER: usize = 64 * 1024;

/// Error type returned by flow-control callbacks.
pub type ProtocolError = Box<dyn std::error::Error>;

/// The consumer side of a [`Transport`].
///
/// Callbacks run on the transport's scheduler and must not block. They may
/// call back into the transport, for example to write a reply from
/// [`data_received`](Self::data_received).
pub trait Protocol {
    /// The transport is ready. Called once, before any other callback.
    fn connection_made(&self, _transport: &Transport) {}

    /// Bytes arrived from the device.
    fn data_received(&self, _data: &[u8]) {}

    /// The connection is closed. `cause` is `None` for a requested close.
    ///
    /// Called at most once; no other callback follows it.
    fn connection_lost(&self, _cause: Option<Error>) {}

    /// The outbound buffer rose above the high-water mark.
    fn pause_writing(&self) -> std::result::Result<(), ProtocolError> {
        Ok(())
    }

    /// The outbound buffer fell to the low-water mark.
    fn resume_writing(&self) -> std::result::Result<(), ProtocolError> {
        Ok(())
    }

    /// The modem or line status changed.
    fn modem_status_changed(&self, _status: ModemStatus) {}
}

/// High- and low-water marks of the outbound buffer, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBufferLimits {
    high: usize,
    low: usize,
}

impl Default for WriteBufferLimits {
    fn default() -> Self {
        Self {
            high: DEFAULT_HIGH_WATER,
            low: DEFAULT_HIGH_WATER / 4,
        }
    }
}

impl WriteBufferLimits {
    /// Build limits from optional marks.
    ///
    /// A missing high mark defaults to four times the low mark, or to
    /// [`DEFAULT_HIGH_WATER`] when both are missing. A missing low mark
    /// defaults to a quarter of the high mark.
    pub fn new(high: Option<usize>, low: Option<usize>) -> Result<Self> {
        let high = match (high, low) {
            (Some(high), _) => high,
            (None, Some(low)) => low.saturating_mul(4),
            (None, None) => DEFAULT_HIGH_WATER,
        };
        let low = low.unwrap_or(high / 4);
        if high < low {
            return Err(Error::InvalidWriteLimits { high, low });
        }
        Ok(Self { high, low })
    }

    /// The high-water mark.
    pub fn high(&self) -> usize {
        self.high
    }

    /// The low-water mark.
    pub fn low(&self) -> usize {
        self.low
    }
}

/// Tuning knobs of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Interval between pump cycles.
    pub poll_interval: Duration,
    /// Maximum bytes taken from the device per read cycle.
    pub max_read_size: usize,
    /// The write pump only writes while the device transmit queue holds
    /// fewer bytes than this.
    pub max_out_waiting: usize,
    /// Backpressure watermarks.
    pub write_buffer_limits: WriteBufferLimits,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            max_out_waiting: DEFAULT_MAX_OUT_WAITING,
            write_buffer_limits: WriteBufferLimits::default(),
        }
    }
}

impl TransportConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pump interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum read size per cycle.
    pub fn max_read_size(mut self, size: usize) -> Self {
        self.max_read_size = size.max(1);
        self
    }

    /// Set the transmit queue limit.
    pub fn max_out_waiting(mut self, size: usize) -> Self {
        self.max_out_waiting = size;
        self
    }

    /// Set the backpressure watermarks.
    pub fn write_buffer_limits(mut self, limits: WriteBufferLimits) -> Self {
        self.write_buffer_limits = limits;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowSignal {
    Pause,
    Resume,
}

/// Backpressure hysteresis: pause above `high`, resume at or below `low`.
#[derive(Debug, Default, Clone, Copy)]
struct FlowState {
    paused: bool,
}

impl FlowState {
    fn update(&mut self, size: usize, limits: WriteBufferLimits) -> Option<FlowSignal> {
        if !self.paused && size > limits.high {
            self.paused = true;
            Some(FlowSignal::Pause)
        } else if self.paused && size <= limits.low {
            self.paused = false;
            Some(FlowSignal::Resume)
        } else {
            None
        }
    }
}

struct Shared {
    device: Option<Device>,
    protocol: Option<Rc<dyn Protocol>>,
    config: TransportConfig,
    closing: bool,
    closed: bool,
    lost_scheduled: bool,
    reading: bool,
    reader: Option<JoinHandle<()>>,
    modem_poller: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    write_buffer: VecDeque<Vec<u8>>,
    buffer_size: usize,
    flow: FlowState,
    modem: Option<ModemStatus>,
}

impl Shared {
    fn stop_reader(&mut self) {
        if let Some(task) = self.reader.take() {
            task.abort();
        }
        if let Some(task) = self.modem_poller.take() {
            task.abort();
        }
    }

    fn stop_writer(&mut self) {
        if let Some(task) = self.writer.take() {
            task.abort();
        }
    }

    fn update_flow(&mut self) -> Option<FlowSignal> {
        let limits = self.config.write_buffer_limits;
        self.flow.update(self.buffer_size, limits)
    }
}

enum WriteProgress {
    Pending,
    Flushed { shutdown: bool },
    Stopped,
}

/// A read/write session bound to one device and one consumer.
///
/// `Transport` is a cheap handle; clones refer to the same session.
#[derive(Clone)]
pub struct Transport {
    shared: Rc<RefCell<Shared>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("Transport");
        if let Ok(s) = self.shared.try_borrow() {
            d.field("closing", &s.closing)
                .field("reading", &s.reading)
                .field("buffer_size", &s.buffer_size);
        }
        d.finish_non_exhaustive()
    }
}

// ---- Construction ----

impl Transport {
    /// Bind `device` to `protocol` and start the session.
    ///
    /// The device is switched to minimal native timeouts. The consumer's
    /// [`connection_made`](Protocol::connection_made) runs on the next
    /// scheduler turn, followed by the read pump.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio [`LocalSet`](tokio::task::LocalSet).
    pub fn new(mut device: Device, protocol: Rc<dyn Protocol>, config: TransportConfig) -> Result<Self> {
        device.set_timeouts_ms(1, 1)?;
        log::debug!("starting transport for {:?}", device.info().description);

        let transport = Self {
            shared: Rc::new(RefCell::new(Shared {
                device: Some(device),
                protocol: Some(protocol),
                config,
                closing: false,
                closed: false,
                lost_scheduled: false,
                reading: true,
                reader: None,
                modem_poller: None,
                writer: None,
                write_buffer: VecDeque::new(),
                buffer_size: 0,
                flow: FlowState::default(),
                modem: None,
            })),
        };

        let startup = transport.clone();
        tokio::task::spawn_local(async move { startup.start() });
        Ok(transport)
    }

    fn start(&self) {
        let protocol = self.shared.borrow().protocol.clone();
        if let Some(protocol) = protocol {
            protocol.connection_made(self);
        }
        let mut s = self.shared.borrow_mut();
        if s.reading && !s.closing {
            self.spawn_reader(&mut s);
        }
    }

    fn spawn_reader(&self, s: &mut Shared) {
        if s.reader.is_none() {
            let pump = self.clone();
            s.reader = Some(tokio::task::spawn_local(pump.read_pump()));
        }
        if s.modem_poller.is_none() {
            let pump = self.clone();
            s.modem_poller = Some(tokio::task::spawn_local(pump.modem_pump()));
        }
    }
}

// ---- Read side ----

impl Transport {
    /// Stop delivering received data until [`resume_reading`](Self::resume_reading).
    pub fn pause_reading(&self) {
        let mut s = self.shared.borrow_mut();
        if s.closing || !s.reading {
            return;
        }
        s.reading = false;
        s.stop_reader();
        log::trace!("reading paused");
    }

    /// Resume delivering received data.
    pub fn resume_reading(&self) {
        let mut s = self.shared.borrow_mut();
        if s.closing || s.reading {
            return;
        }
        s.reading = true;
        self.spawn_reader(&mut s);
        log::trace!("reading resumed");
    }

    /// Whether the read pump is enabled.
    pub fn is_reading(&self) -> bool {
        let s = self.shared.borrow();
        s.reading && !s.closing
    }

    async fn read_pump(self) {
        let interval = self.shared.borrow().config.poll_interval;
        loop {
            match self.poll_read() {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    self.fatal_error(e);
                    return;
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One read cycle. Returns `false` once reading should stop.
    fn poll_read(&self) -> Result<bool> {
        let (data, protocol) = {
            let mut guard = self.shared.borrow_mut();
            let s = &mut *guard;
            if s.closing || !s.reading {
                return Ok(false);
            }
            let Some(device) = s.device.as_mut() else {
                return Ok(false);
            };
            let queued = device.queue_status()?;
            if queued == 0 {
                return Ok(true);
            }
            let data = device.read(queued.min(s.config.max_read_size))?;
            log::trace!("read {} of {queued} queued bytes", data.len());
            (data, s.protocol.clone())
        };
        if data.is_empty() {
            return Ok(true);
        }
        if let Some(protocol) = protocol {
            protocol.data_received(&data);
        }
        Ok(true)
    }

    async fn modem_pump(self) {
        let interval = self.shared.borrow().config.poll_interval;
        loop {
            match self.poll_modem() {
                Ok(true) => {}
                Ok(false) => return,
                Err(Error::Device(Status::NotSupported)) => {
                    log::debug!("modem status not supported by driver, not polling");
                    return;
                }
                Err(e) => {
                    self.fatal_error(e);
                    return;
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    fn poll_modem(&self) -> Result<bool> {
        let (status, protocol) = {
            let mut guard = self.shared.borrow_mut();
            let s = &mut *guard;
            if s.closing || !s.reading {
                return Ok(false);
            }
            let Some(device) = s.device.as_ref() else {
                return Ok(false);
            };
            let status = device.modem_status()?;
            if s.modem == Some(status) {
                return Ok(true);
            }
            s.modem = Some(status);
            (status, s.protocol.clone())
        };
        log::debug!("modem status changed: {:#06x}", status.raw());
        if let Some(protocol) = protocol {
            protocol.modem_status_changed(status);
        }
        Ok(true)
    }
}

// ---- Write side ----

impl Transport {
    /// Queue `data` for transmission.
    ///
    /// Data written after [`close`](Self::close) or [`abort`](Self::abort)
    /// is silently discarded.
    pub fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let signal = {
            let mut s = self.shared.borrow_mut();
            if s.closing {
                log::trace!("discarding {} bytes written after close", data.len());
                return;
            }
            s.write_buffer.push_back(data.to_vec());
            s.buffer_size += data.len();
            if s.writer.is_none() {
                let pump = self.clone();
                s.writer = Some(tokio::task::spawn_local(pump.write_pump()));
            }
            s.update_flow()
        };
        self.signal_flow(signal);
    }

    /// Always fails: the device has no notion of half-closing.
    pub fn write_eof(&self) -> Result<()> {
        Err(Error::Unsupported("write_eof"))
    }

    /// Always `false`.
    pub fn can_write_eof(&self) -> bool {
        false
    }

    /// Bytes waiting in the outbound buffer.
    pub fn write_buffer_size(&self) -> usize {
        self.shared.borrow().buffer_size
    }

    /// The backpressure watermarks.
    pub fn write_buffer_limits(&self) -> WriteBufferLimits {
        self.shared.borrow().config.write_buffer_limits
    }

    /// Change the backpressure watermarks. See [`WriteBufferLimits::new`].
    pub fn set_write_buffer_limits(&self, high: Option<usize>, low: Option<usize>) -> Result<()> {
        let limits = WriteBufferLimits::new(high, low)?;
        let signal = {
            let mut s = self.shared.borrow_mut();
            s.config.write_buffer_limits = limits;
            s.update_flow()
        };
        self.signal_flow(signal);
        Ok(())
    }

    /// Discard pending output without sending it.
    pub fn clear_write_buffer(&self) {
        let (signal, shutdown) = {
            let mut s = self.shared.borrow_mut();
            s.stop_writer();
            s.write_buffer.clear();
            s.buffer_size = 0;
            (s.update_flow(), s.closing)
        };
        self.signal_flow(signal);
        if shutdown {
            self.schedule_connection_lost(None, false);
        }
    }

    async fn write_pump(self) {
        let interval = self.shared.borrow().config.poll_interval;
        loop {
            match self.poll_write() {
                Ok(WriteProgress::Pending) => {}
                Ok(WriteProgress::Flushed { shutdown }) => {
                    if shutdown {
                        self.schedule_connection_lost(None, false);
                    }
                    return;
                }
                Ok(WriteProgress::Stopped) => return,
                Err(e) => {
                    self.fatal_error(e);
                    return;
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One write cycle.
    fn poll_write(&self) -> Result<WriteProgress> {
        let (progress, signal) = {
            let mut guard = self.shared.borrow_mut();
            let s = &mut *guard;
            if s.lost_scheduled {
                return Ok(WriteProgress::Stopped);
            }
            let Some(device) = s.device.as_mut() else {
                return Ok(WriteProgress::Stopped);
            };
            if s.buffer_size > 0 {
                let waiting = device.status()?.tx_queue as usize;
                if waiting >= s.config.max_out_waiting {
                    log::trace!("{waiting} bytes waiting in device, holding off");
                    return Ok(WriteProgress::Pending);
                }
                let data: Vec<u8> = s.write_buffer.drain(..).flatten().collect();
                let written = device.write(&data)?.min(data.len());
                log::trace!("wrote {written} of {} buffered bytes", data.len());
                if written < data.len() {
                    s.write_buffer.push_front(data[written..].to_vec());
                }
                s.buffer_size = data.len() - written;
            }
            let progress = if s.buffer_size == 0 {
                // Detach rather than abort: this task is the writer.
                s.writer = None;
                WriteProgress::Flushed {
                    shutdown: s.closing,
                }
            } else {
                WriteProgress::Pending
            };
            (progress, s.update_flow())
        };
        self.signal_flow(signal);
        Ok(progress)
    }

    fn signal_flow(&self, signal: Option<FlowSignal>) {
        let Some(signal) = signal else {
            return;
        };
        let protocol = self.shared.borrow().protocol.clone();
        let Some(protocol) = protocol else {
            return;
        };
        let result = match signal {
            FlowSignal::Pause => protocol.pause_writing(),
            FlowSignal::Resume => protocol.resume_writing(),
        };
        if let Err(e) = result {
            log::error!("protocol {signal:?} callback failed: {e}");
        }
    }
}

// ---- Shutdown ----

impl Transport {
    /// Close gracefully: stop reading, send pending output, then tear down.
    ///
    /// Calling `close` again has no effect.
    pub fn close(&self) {
        let flushed = {
            let mut s = self.shared.borrow_mut();
            if s.closing {
                return;
            }
            s.closing = true;
            s.stop_reader();
            log::debug!("closing transport, {} bytes pending", s.buffer_size);
            if s.buffer_size == 0 {
                s.stop_writer();
                true
            } else {
                false
            }
        };
        if flushed {
            self.schedule_connection_lost(None, false);
        }
    }

    /// Tear down immediately, discarding pending output.
    pub fn abort(&self) {
        self.force_close(None);
    }

    /// Whether [`close`](Self::close) or [`abort`](Self::abort) was called
    /// or the connection failed.
    pub fn is_closing(&self) -> bool {
        self.shared.borrow().closing
    }

    /// Whether teardown has completed.
    pub fn is_closed(&self) -> bool {
        self.shared.borrow().closed
    }

    fn fatal_error(&self, err: Error) {
        log::error!("fatal error on D2XX transport: {err}");
        self.force_close(Some(err));
    }

    fn force_close(&self, cause: Option<Error>) {
        {
            let mut s = self.shared.borrow_mut();
            if s.lost_scheduled {
                return;
            }
            s.closing = true;
            s.stop_reader();
            s.stop_writer();
            s.write_buffer.clear();
            s.buffer_size = 0;
        }
        self.schedule_connection_lost(cause, true);
    }

    fn schedule_connection_lost(&self, cause: Option<Error>, purge: bool) {
        {
            let mut s = self.shared.borrow_mut();
            if s.lost_scheduled {
                return;
            }
            s.lost_scheduled = true;
        }
        let transport = self.clone();
        tokio::task::spawn_local(async move { transport.call_connection_lost(cause, purge) });
    }

    fn call_connection_lost(&self, cause: Option<Error>, purge: bool) {
        let protocol = {
            let mut s = self.shared.borrow_mut();
            s.stop_reader();
            s.stop_writer();
            if purge {
                if let Some(device) = s.device.as_mut() {
                    if let Err(e) = device.purge(Purge::Both) {
                        log::debug!("purge during shutdown failed: {e}");
                    }
                }
            }
            s.protocol.clone()
        };

        if let Some(protocol) = protocol {
            protocol.connection_lost(cause);
        }

        let (device, _protocol) = {
            let mut s = self.shared.borrow_mut();
            s.closed = true;
            s.write_buffer.clear();
            s.buffer_size = 0;
            (s.device.take(), s.protocol.take())
        };
        if let Some(mut device) = device {
            if let Err(e) = device.close() {
                log::warn!("failed to close device: {e}");
            }
        }
        log::debug!("transport closed");
    }
}

// ---- Introspection ----

impl Transport {
    /// Run `f` with the bound device.
    ///
    /// Fails with [`Status::DeviceNotOpened`] once the transport is closed.
    /// `f` must not call back into this transport.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut Device) -> R) -> Result<R> {
        let mut s = self.shared.borrow_mut();
        let device = s
            .device
            .as_mut()
            .ok_or(Error::Device(Status::DeviceNotOpened))?;
        Ok(f(device))
    }

    /// The bound consumer, until the transport is closed.
    pub fn protocol(&self) -> Option<Rc<dyn Protocol>> {
        self.shared.borrow().protocol.clone()
    }

    /// The active configuration.
    pub fn config(&self) -> TransportConfig {
        self.shared.borrow().config
    }

    /// Last modem status seen by the poller.
    pub fn last_modem_status(&self) -> Option<ModemStatus> {
        self.shared.borrow().modem
    }
}
