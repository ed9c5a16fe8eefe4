//! Connection factory.
//!
//! Opens a device and binds it to a fresh [`Transport`] and consumer.

use std::rc::Rc;

use crate::context::Device;
use crate::device_info::OpenOptions;
use crate::error::Result;
use crate::transport::{Protocol, Transport, TransportConfig};

/// Open the device selected by `options` and start a transport for it.
///
/// `factory` builds the consumer. Both the transport and the consumer are
/// returned; the consumer's [`connection_made`](Protocol::connection_made)
/// runs on the next scheduler turn.
///
/// # Panics
///
/// Panics if called outside a tokio [`LocalSet`](tokio::task::LocalSet).
///
/// # Example
///
/// ```no_run
/// use ftd2xx::{create_connection, OpenOptions, Protocol, TransportConfig};
///
/// struct Printer;
///
/// impl Protocol for Printer {
///     fn data_received(&self, data: &[u8]) {
///         println!("{}", String::from_utf8_lossy(data));
///     }
/// }
///
/// # async fn demo() -> ftd2xx::Result<()> {
/// let (transport, _printer) =
///     create_connection(&OpenOptions::new().index(0), || Printer, TransportConfig::new())?;
/// transport.write(b"ping\r\n");
/// # Ok(())
/// # }
/// ```
pub fn create_connection<P, F>(
    options: &OpenOptions,
    factory: F,
    config: TransportConfig,
) -> Result<(Transport, Rc<P>)>
where
    P: Protocol + 'static,
    F: FnOnce() -> P,
{
    let device = options.open()?;
    connect(device, factory, config)
}

/// Start a transport for an already open device.
///
/// # Panics
///
/// Panics if called outside a tokio [`LocalSet`](tokio::task::LocalSet).
pub fn connect<P, F>(device: Device, factory: F, config: TransportConfig) -> Result<(Transport, Rc<P>)>
where
    P: Protocol + 'static,
    F: FnOnce() -> P,
{
    let protocol = Rc::new(factory());
    let transport = Transport::new(device, protocol.clone(), config)?;
    Ok((transport, protocol))
}
