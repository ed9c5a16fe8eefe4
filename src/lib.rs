//! Rust bindings to the FTDI D2XX driver, with async I/O on tokio.
//!
//! This crate loads the vendor D2XX library at runtime and exposes its
//! device handle as [`Device`]. On top of the synchronous handle it provides
//! a timeout-aware async reader ([`AsyncDevice`]) and an event-driven
//! [`Transport`] with read/write pumps, backpressure and ordered shutdown.
//!
//! # Quick Start
//!
//! ```no_run
//! use ftd2xx::{DataBits, Device, Parity, StopBits};
//!
//! // Open the first device the driver knows about
//! let mut dev = Device::open(0)?;
//! dev.set_baud_rate(115200)?;
//! dev.set_data_characteristics(DataBits::Eight, StopBits::One, Parity::None)?;
//! dev.write(b"Hello from Rust!\r\n")?;
//! # Ok::<(), ftd2xx::Error>(())
//! ```
//!
//! # Features
//!
//! - **Device discovery**: Enumerate devices and open them by index, serial
//!   number, description or location ([`OpenOptions`]).
//! - **Serial I/O**: Baud rate, line properties, flow control, modem lines.
//! - **Timed async reads**: Suspend until N bytes arrive or a timeout expires,
//!   with cancellation that never loses bytes ([`async_transfer`]).
//! - **Transport**: Protocol callbacks driven by polling pumps, with
//!   high/low-water backpressure and graceful or abrupt close ([`transport`]).
//! - **Streams**: Awaitable reader/writer pair over a transport ([`stream`]).
//! - **`Read` / `Write` traits**: Use `Device` anywhere `std::io::Read`
//!   or `std::io::Write` is expected, and with `embedded-io` behind the
//!   `embedded-io` feature.
//!
//! # Runtime requirements
//!
//! The D2XX shared library must be installed. Set `FTD2XX_LIBRARY` to its
//! path if it is not on the default search path. Transports and streams run
//! on a tokio [`LocalSet`](tokio::task::LocalSet).

pub mod async_transfer;
pub mod connection;
pub mod constants;
pub mod context;
pub mod device_info;
pub mod driver;
pub mod error;
#[cfg(feature = "embedded-io")]
pub mod hal;
pub mod library;
pub mod stream;
pub mod transport;
pub mod types;

// ---- Convenience re-exports ----

pub use async_transfer::{AsyncDevice, TimeoutPolicy};
pub use connection::{connect, create_connection};
pub use constants::FTDI_VID;
pub use context::Device;
pub use device_info::{
    create_device_info_list, device_count, device_info_detail, library_version, list_devices,
    list_devices_with, set_vid_pid, vid_pid, DeviceInfo, DeviceInfoDetail, DeviceSelector,
    OpenOptions,
};
pub use driver::{Driver, RawHandle};
pub use error::{Error, Result};
pub use library::library;
pub use stream::{connect_stream, open_connection, StreamReader, StreamWriter};
pub use transport::{Protocol, ProtocolError, Transport, TransportConfig, WriteBufferLimits};
pub use types::*;
