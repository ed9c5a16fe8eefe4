//! Wire-level constants of the D2XX programming interface.
//!
//! These mirror the numeric values documented in the FTDI D2XX Programmer's
//! Guide. Most users should prefer the typed wrappers in [`crate::types`].

// ---- FTDI Vendor ID and known Product IDs ----

/// Default FTDI vendor ID.
pub const FTDI_VID: u16 = 0x0403;

/// Known FTDI product IDs.
pub mod pid {
    /// FT232AM, FT232BM, FT232R.
    pub const FT232: u16 = 0x6001;
    /// FT2232C/D/H.
    pub const FT2232: u16 = 0x6010;
    /// FT4232H.
    pub const FT4232: u16 = 0x6011;
    /// FT232H.
    pub const FT232H: u16 = 0x6014;
    /// FT230X.
    pub const FT230X: u16 = 0x6015;
}

// ---- Status ----

/// `FT_OK`: the only success status.
pub const FT_OK: u32 = 0;

// ---- FT_OpenEx flags ----

/// `FT_OpenEx` argument is a serial number string.
pub const OPEN_BY_SERIAL_NUMBER: u32 = 1;
/// `FT_OpenEx` argument is a product description string.
pub const OPEN_BY_DESCRIPTION: u32 = 2;
/// `FT_OpenEx` argument is a location id (Windows only).
pub const OPEN_BY_LOCATION: u32 = 4;

// ---- Purge ----

/// Purge the receive buffer.
pub const PURGE_RX: u32 = 1;
/// Purge the transmit buffer.
pub const PURGE_TX: u32 = 2;

// ---- Flow control ----

pub(crate) const FLOW_NONE: u16 = 0x0000;
pub(crate) const FLOW_RTS_CTS: u16 = 0x0100;
pub(crate) const FLOW_DTR_DSR: u16 = 0x0200;
pub(crate) const FLOW_XON_XOFF: u16 = 0x0400;

// ---- Event notification bits ----

/// A character was received.
pub const EVENT_RXCHAR: u32 = 1;
/// A modem status line changed.
pub const EVENT_MODEM_STATUS: u32 = 2;
/// A line status error occurred.
pub const EVENT_LINE_STATUS: u32 = 4;

// ---- Buffers ----

/// Size of the string buffers handed to the driver for serial numbers and
/// descriptions.
pub(crate) const MAX_DESCRIPTION_SIZE: usize = 256;
