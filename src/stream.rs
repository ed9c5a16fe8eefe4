//! Stream-style reader and writer over a [`Transport`].
//!
//! [`open_connection`] returns a [`StreamReader`] / [`StreamWriter`] pair for
//! code that prefers awaiting data over implementing [`Protocol`]. Received
//! bytes are buffered; when the buffer grows past its limit the transport
//! stops reading until the reader catches up.
//!
//! ```no_run
//! use ftd2xx::{open_connection, OpenOptions, TransportConfig};
//!
//! # async fn demo() -> ftd2xx::Result<()> {
//! let (mut reader, writer) = open_connection(&OpenOptions::new(), TransportConfig::new())?;
//! writer.write(b"AT\r");
//! writer.drain().await?;
//! let reply = reader.read_until(b'\r').await?;
//! writer.close();
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::connection::connect;
use crate::context::Device;
use crate::device_info::OpenOptions;
use crate::error::{Error, Result};
use crate::transport::{Protocol, ProtocolError, Transport, TransportConfig};

/// Default size of the receive buffer before reading is paused.
pub const DEFAULT_STREAM_LIMIT: usize = 64 * 1024;

struct StreamState {
    buffer: VecDeque<u8>,
    limit: usize,
    eof: bool,
    error: Option<Error>,
    reading_paused: bool,
    writing_paused: bool,
    transport: Option<Transport>,
}

struct StreamShared {
    state: RefCell<StreamState>,
    readable: Notify,
    writable: Notify,
}

impl StreamShared {
    /// Resume the transport once the buffer is back under the limit.
    fn maybe_resume_reading(&self, force: bool) {
        let transport = {
            let mut s = self.state.borrow_mut();
            if !s.reading_paused || (!force && s.buffer.len() > s.limit) {
                return;
            }
            s.reading_paused = false;
            s.transport.clone()
        };
        if let Some(transport) = transport {
            transport.resume_reading();
        }
    }
}

struct StreamProtocol {
    shared: Rc<StreamShared>,
}

impl Protocol for StreamProtocol {
    fn data_received(&self, data: &[u8]) {
        let pause = {
            let mut s = self.shared.state.borrow_mut();
            s.buffer.extend(data);
            if !s.reading_paused && s.buffer.len() > s.limit {
                s.reading_paused = true;
                s.transport.clone()
            } else {
                None
            }
        };
        if let Some(transport) = pause {
            log::trace!("stream buffer full, pausing reads");
            transport.pause_reading();
        }
        self.shared.readable.notify_waiters();
    }

    fn connection_lost(&self, cause: Option<Error>) {
        {
            let mut s = self.shared.state.borrow_mut();
            s.eof = true;
            s.error = cause;
            s.transport = None;
            s.writing_paused = false;
        }
        self.shared.readable.notify_waiters();
        self.shared.writable.notify_waiters();
    }

    fn pause_writing(&self) -> std::result::Result<(), ProtocolError> {
        self.shared.state.borrow_mut().writing_paused = true;
        Ok(())
    }

    fn resume_writing(&self) -> std::result::Result<(), ProtocolError> {
        self.shared.state.borrow_mut().writing_paused = false;
        self.shared.writable.notify_waiters();
        Ok(())
    }
}

/// The receiving half of a stream connection.
pub struct StreamReader {
    shared: Rc<StreamShared>,
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader").finish_non_exhaustive()
    }
}

impl StreamReader {
    /// Wait until `ready` holds for the state or the stream has ended.
    async fn wait_for(&self, ready: impl Fn(&StreamState) -> bool) {
        loop {
            {
                let s = self.shared.state.borrow();
                if s.eof || ready(&s) {
                    return;
                }
            }
            // Waiting for data the transport is not delivering would hang.
            self.shared.maybe_resume_reading(true);
            self.shared.readable.notified().await;
        }
    }

    fn take(&self, n: usize) -> Vec<u8> {
        let data: Vec<u8> = {
            let mut s = self.shared.state.borrow_mut();
            let n = n.min(s.buffer.len());
            s.buffer.drain(..n).collect()
        };
        self.shared.maybe_resume_reading(false);
        data
    }

    fn take_error(&self) -> Option<Error> {
        self.shared.state.borrow_mut().error.take()
    }

    /// Read up to `n` bytes, waiting until at least one is available.
    ///
    /// Returns an empty vector at end of stream. If the connection failed,
    /// the error is returned once after the buffered bytes.
    pub async fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        self.wait_for(|s| !s.buffer.is_empty()).await;
        if self.shared.state.borrow().buffer.is_empty() {
            return match self.take_error() {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }
        Ok(self.take(n))
    }

    /// Read exactly `n` bytes.
    ///
    /// Fails with [`Error::IncompleteRead`], holding the bytes received, if
    /// the stream ends first.
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        self.wait_for(|s| s.buffer.len() >= n).await;
        if self.shared.state.borrow().buffer.len() >= n {
            return Ok(self.take(n));
        }
        if let Some(e) = self.take_error() {
            return Err(e);
        }
        let data = self.take(usize::MAX);
        Err(Error::IncompleteRead { requested: n, data })
    }

    /// Read up to and including the first `delimiter`.
    ///
    /// Fails with [`Error::LimitOverrun`] if the buffer fills without a
    /// delimiter, and with [`Error::IncompleteRead`] if the stream ends first.
    pub async fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>> {
        self.wait_for(|s| s.buffer.contains(&delimiter) || s.buffer.len() > s.limit)
            .await;
        let (found, limit, len) = {
            let s = self.shared.state.borrow();
            let found = s.buffer.iter().position(|&b| b == delimiter);
            (found, s.limit, s.buffer.len())
        };
        match found {
            Some(pos) => Ok(self.take(pos + 1)),
            None if len > limit => Err(Error::LimitOverrun { limit }),
            None => {
                if let Some(e) = self.take_error() {
                    return Err(e);
                }
                let data = self.take(usize::MAX);
                Err(Error::IncompleteRead {
                    requested: data.len() + 1,
                    data,
                })
            }
        }
    }

    /// Whether the stream ended and every buffered byte was read.
    pub fn at_eof(&self) -> bool {
        let s = self.shared.state.borrow();
        s.eof && s.buffer.is_empty()
    }

    /// Bytes buffered and not yet read.
    pub fn buffered(&self) -> usize {
        self.shared.state.borrow().buffer.len()
    }
}

/// The sending half of a stream connection.
pub struct StreamWriter {
    transport: Transport,
    shared: Rc<StreamShared>,
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl StreamWriter {
    /// Queue `data` for transmission. See [`Transport::write`].
    pub fn write(&self, data: &[u8]) {
        self.transport.write(data);
    }

    /// Wait until the transport accepts more output.
    ///
    /// Returns immediately unless the outbound buffer is above its
    /// high-water mark. Fails once the connection is lost.
    pub async fn drain(&self) -> Result<()> {
        loop {
            {
                let s = self.shared.state.borrow();
                if s.eof {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection lost",
                    )));
                }
                if !s.writing_paused {
                    return Ok(());
                }
            }
            self.shared.writable.notified().await;
        }
    }

    /// Close gracefully. See [`Transport::close`].
    pub fn close(&self) {
        self.transport.close();
    }

    /// Close immediately. See [`Transport::abort`].
    pub fn abort(&self) {
        self.transport.abort();
    }

    /// Whether the connection is closing or closed.
    pub fn is_closing(&self) -> bool {
        self.transport.is_closing()
    }

    /// Wait until the connection is torn down.
    pub async fn wait_closed(&self) {
        loop {
            if self.shared.state.borrow().eof {
                return;
            }
            self.shared.writable.notified().await;
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Open the device selected by `options` as a reader/writer pair.
///
/// # Panics
///
/// Panics if called outside a tokio [`LocalSet`](tokio::task::LocalSet).
pub fn open_connection(
    options: &OpenOptions,
    config: TransportConfig,
) -> Result<(StreamReader, StreamWriter)> {
    connect_stream(options.open()?, config, DEFAULT_STREAM_LIMIT)
}

/// Wrap an already open device as a reader/writer pair.
///
/// `limit` bounds the receive buffer before reading is paused.
///
/// # Panics
///
/// Panics if called outside a tokio [`LocalSet`](tokio::task::LocalSet).
pub fn connect_stream(
    device: Device,
    config: TransportConfig,
    limit: usize,
) -> Result<(StreamReader, StreamWriter)> {
    let shared = Rc::new(StreamShared {
        state: RefCell::new(StreamState {
            buffer: VecDeque::new(),
            limit,
            eof: false,
            error: None,
            reading_paused: false,
            writing_paused: false,
            transport: None,
        }),
        readable: Notify::new(),
        writable: Notify::new(),
    });
    let protocol_shared = shared.clone();
    let (transport, _protocol) = connect(
        device,
        move || StreamProtocol {
            shared: protocol_shared,
        },
        config,
    )?;
    shared.state.borrow_mut().transport = Some(transport.clone());

    let reader = StreamReader {
        shared: shared.clone(),
    };
    let writer = StreamWriter { transport, shared };
    Ok((reader, writer))
}
