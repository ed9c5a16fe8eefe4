//! Type definitions for D2XX device communication.
//!
//! These types model the status codes returned by the native driver, the
//! serial line configuration accepted by it, and the status words it reports.

use std::fmt;

use crate::constants::*;

/// A native `FT_STATUS` value other than `FT_OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `FT_INVALID_HANDLE`.
    InvalidHandle,
    /// `FT_DEVICE_NOT_FOUND`.
    DeviceNotFound,
    /// `FT_DEVICE_NOT_OPENED`.
    DeviceNotOpened,
    /// `FT_IO_ERROR`.
    IoError,
    /// `FT_INSUFFICIENT_RESOURCES`.
    InsufficientResources,
    /// `FT_INVALID_PARAMETER`.
    InvalidParameter,
    /// `FT_INVALID_BAUD_RATE`.
    InvalidBaudRate,
    /// `FT_DEVICE_NOT_OPENED_FOR_ERASE`.
    DeviceNotOpenedForErase,
    /// `FT_DEVICE_NOT_OPENED_FOR_WRITE`.
    DeviceNotOpenedForWrite,
    /// `FT_FAILED_TO_WRITE_DEVICE`.
    FailedToWriteDevice,
    /// `FT_EEPROM_READ_FAILED`.
    EepromReadFailed,
    /// `FT_EEPROM_WRITE_FAILED`.
    EepromWriteFailed,
    /// `FT_EEPROM_ERASE_FAILED`.
    EepromEraseFailed,
    /// `FT_EEPROM_NOT_PRESENT`.
    EepromNotPresent,
    /// `FT_EEPROM_NOT_PROGRAMMED`.
    EepromNotProgrammed,
    /// `FT_INVALID_ARGS`.
    InvalidArgs,
    /// `FT_NOT_SUPPORTED`.
    NotSupported,
    /// `FT_OTHER_ERROR`.
    OtherError,
    /// A status code this crate does not know about.
    Unknown(u32),
}

impl Status {
    /// Translate a raw status code. Returns `None` for `FT_OK`.
    pub fn from_code(code: u32) -> Option<Self> {
        let status = match code {
            FT_OK => return None,
            1 => Self::InvalidHandle,
            2 => Self::DeviceNotFound,
            3 => Self::DeviceNotOpened,
            4 => Self::IoError,
            5 => Self::InsufficientResources,
            6 => Self::InvalidParameter,
            7 => Self::InvalidBaudRate,
            8 => Self::DeviceNotOpenedForErase,
            9 => Self::DeviceNotOpenedForWrite,
            10 => Self::FailedToWriteDevice,
            11 => Self::EepromReadFailed,
            12 => Self::EepromWriteFailed,
            13 => Self::EepromEraseFailed,
            14 => Self::EepromNotPresent,
            15 => Self::EepromNotProgrammed,
            16 => Self::InvalidArgs,
            17 => Self::NotSupported,
            18 => Self::OtherError,
            other => Self::Unknown(other),
        };
        Some(status)
    }

    /// The raw status code.
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidHandle => 1,
            Self::DeviceNotFound => 2,
            Self::DeviceNotOpened => 3,
            Self::IoError => 4,
            Self::InsufficientResources => 5,
            Self::InvalidParameter => 6,
            Self::InvalidBaudRate => 7,
            Self::DeviceNotOpenedForErase => 8,
            Self::DeviceNotOpenedForWrite => 9,
            Self::FailedToWriteDevice => 10,
            Self::EepromReadFailed => 11,
            Self::EepromWriteFailed => 12,
            Self::EepromEraseFailed => 13,
            Self::EepromNotPresent => 14,
            Self::EepromNotProgrammed => 15,
            Self::InvalidArgs => 16,
            Self::NotSupported => 17,
            Self::OtherError => 18,
            Self::Unknown(code) => code,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::InvalidHandle => "INVALID_HANDLE",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::DeviceNotOpened => "DEVICE_NOT_OPENED",
            Self::IoError => "IO_ERROR",
            Self::InsufficientResources => "INSUFFICIENT_RESOURCES",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InvalidBaudRate => "INVALID_BAUD_RATE",
            Self::DeviceNotOpenedForErase => "DEVICE_NOT_OPENED_FOR_ERASE",
            Self::DeviceNotOpenedForWrite => "DEVICE_NOT_OPENED_FOR_WRITE",
            Self::FailedToWriteDevice => "FAILED_TO_WRITE_DEVICE",
            Self::EepromReadFailed => "EEPROM_READ_FAILED",
            Self::EepromWriteFailed => "EEPROM_WRITE_FAILED",
            Self::EepromEraseFailed => "EEPROM_ERASE_FAILED",
            Self::EepromNotPresent => "EEPROM_NOT_PRESENT",
            Self::EepromNotProgrammed => "EEPROM_NOT_PROGRAMMED",
            Self::InvalidArgs => "INVALID_ARGS",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::OtherError => "OTHER_ERROR",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
            _ => f.write_str(self.name()),
        }
    }
}

/// Device family as reported by `FT_GetDeviceInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// FT232BM / FT245BM.
    Ft232Bm,
    /// FT8U232AM.
    Ft232Am,
    /// FT8U100AX.
    Ft100Ax,
    /// The driver could not identify the chip.
    Unknown,
    /// Dual-port chip (FT2232C/D/L).
    Ft2232C,
    /// FT232R / FT245R.
    Ft232R,
    /// Dual hi-speed chip (FT2232H).
    Ft2232H,
    /// Quad-port chip (FT4232H).
    Ft4232H,
    /// Single hi-speed chip (FT232H).
    Ft232H,
    /// FT-X series (FT230X, FT231X, FT234XD, ...).
    FtXSeries,
    /// A type code newer than this crate.
    Other(u32),
}

impl DeviceType {
    /// Decode the raw `FT_DEVICE` value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Ft232Bm,
            1 => Self::Ft232Am,
            2 => Self::Ft100Ax,
            3 => Self::Unknown,
            4 => Self::Ft2232C,
            5 => Self::Ft232R,
            6 => Self::Ft2232H,
            7 => Self::Ft4232H,
            8 => Self::Ft232H,
            9 => Self::FtXSeries,
            other => Self::Other(other),
        }
    }

    /// Whether this is an H-type (hi-speed) chip.
    #[inline]
    pub fn is_h_type(self) -> bool {
        matches!(self, Self::Ft2232H | Self::Ft4232H | Self::Ft232H)
    }
}

/// Parity mode for serial communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
    /// Mark parity (always 1).
    Mark,
    /// Space parity (always 0).
    Space,
}

impl Parity {
    /// Wire encoding for `FT_SetDataCharacteristics`.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Odd => 1,
            Self::Even => 2,
            Self::Mark => 3,
            Self::Space => 4,
        }
    }
}

/// Number of stop bits for serial communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

impl StopBits {
    /// Wire encoding for `FT_SetDataCharacteristics`.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::One => 0,
            Self::Two => 2,
        }
    }
}

/// Number of data bits for serial communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

impl DataBits {
    /// Wire encoding for `FT_SetDataCharacteristics`.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    Disabled,
    /// Hardware RTS/CTS flow control.
    RtsCts,
    /// Hardware DTR/DSR flow control.
    DtrDsr,
    /// Software XON/XOFF flow control. Requires both control characters.
    XonXoff,
}

impl FlowControl {
    /// Wire encoding for `FT_SetFlowControl`.
    pub fn wire_value(self) -> u16 {
        match self {
            Self::Disabled => FLOW_NONE,
            Self::RtsCts => FLOW_RTS_CTS,
            Self::DtrDsr => FLOW_DTR_DSR,
            Self::XonXoff => FLOW_XON_XOFF,
        }
    }
}

/// Bitbang / MPSSE mode selection for `FT_SetBitMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitMode {
    /// Normal serial/FIFO mode (bitbang disabled).
    #[default]
    Reset,
    /// Asynchronous bitbang mode.
    BitBang,
    /// MPSSE mode (FT2232x and later).
    Mpsse,
    /// Synchronous bitbang mode.
    SyncBB,
    /// MCU host bus emulation mode.
    Mcu,
    /// Fast opto-isolated serial mode.
    Opto,
    /// CBUS bitbang mode (configure in EEPROM first).
    Cbus,
    /// Synchronous FIFO mode.
    SyncFf,
    /// FT1284 mode (FT232H).
    Ft1284,
}

impl BitMode {
    /// Wire value for `FT_SetBitMode`.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::BitBang => 0x01,
            Self::Mpsse => 0x02,
            Self::SyncBB => 0x04,
            Self::Mcu => 0x08,
            Self::Opto => 0x10,
            Self::Cbus => 0x20,
            Self::SyncFf => 0x40,
            Self::Ft1284 => 0x80,
        }
    }
}

/// Which buffers `FT_Purge` should clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Purge {
    /// Receive buffer only.
    Rx,
    /// Transmit buffer only.
    Tx,
    /// Both buffers.
    #[default]
    Both,
}

impl Purge {
    /// Wire mask for `FT_Purge`.
    pub fn mask(self) -> u32 {
        match self {
            Self::Rx => PURGE_RX,
            Self::Tx => PURGE_TX,
            Self::Both => PURGE_RX | PURGE_TX,
        }
    }
}

/// How an `FT_OpenEx` identifier should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenBy {
    /// The identifier is the device serial number.
    #[default]
    SerialNumber,
    /// The identifier is the product description.
    Description,
    /// The identifier is a location id. Only supported on Windows.
    Location,
}

impl OpenBy {
    /// Wire flag for `FT_OpenEx`.
    pub fn wire_value(self) -> u32 {
        match self {
            Self::SerialNumber => OPEN_BY_SERIAL_NUMBER,
            Self::Description => OPEN_BY_DESCRIPTION,
            Self::Location => OPEN_BY_LOCATION,
        }
    }
}

/// Decoded modem and line status from `FT_GetModemStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModemStatus {
    raw: u16,
}

impl ModemStatus {
    /// Create from the raw status value. Only the low 16 bits are meaningful.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            raw: (raw & 0xFFFF) as u16,
        }
    }

    /// Raw 16-bit status value.
    pub fn raw(self) -> u16 {
        self.raw
    }

    // -- Byte 0 (modem status lines) --

    /// Clear To Send (CTS) is active.
    pub fn cts(self) -> bool {
        self.raw & 0x10 != 0
    }

    /// Data Set Ready (DSR) is active.
    pub fn dsr(self) -> bool {
        self.raw & 0x20 != 0
    }

    /// Ring Indicator (RI) is active.
    pub fn ri(self) -> bool {
        self.raw & 0x40 != 0
    }

    /// Data Carrier Detect (DCD) is active.
    pub fn dcd(self) -> bool {
        self.raw & 0x80 != 0
    }

    // -- Byte 1 (line status) --

    /// Overrun Error (OE).
    pub fn overrun_error(self) -> bool {
        self.raw & 0x0200 != 0
    }

    /// Parity Error (PE).
    pub fn parity_error(self) -> bool {
        self.raw & 0x0400 != 0
    }

    /// Framing Error (FE).
    pub fn framing_error(self) -> bool {
        self.raw & 0x0800 != 0
    }

    /// Break Interrupt (BI).
    pub fn break_interrupt(self) -> bool {
        self.raw & 0x1000 != 0
    }
}

/// Event bits reported by `FT_GetStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventFlags(u32);

impl EventFlags {
    /// Wrap a raw event word.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw event word.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// A character was received.
    pub fn rx_char(self) -> bool {
        self.0 & EVENT_RXCHAR != 0
    }

    /// A modem status line changed.
    pub fn modem_status(self) -> bool {
        self.0 & EVENT_MODEM_STATUS != 0
    }

    /// A line status error occurred.
    pub fn line_status(self) -> bool {
        self.0 & EVENT_LINE_STATUS != 0
    }
}

/// Queue depths and pending events from `FT_GetStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Bytes waiting in the receive queue.
    pub rx_queue: u32,
    /// Bytes waiting in the transmit queue.
    pub tx_queue: u32,
    /// Pending event bits.
    pub events: EventFlags,
}
