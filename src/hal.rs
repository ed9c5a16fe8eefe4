//! `embedded-io` 0.7 trait implementations.
//!
//! Enable the `embedded-io` feature in your `Cargo.toml` to use a
//! [`Device`] wherever `embedded_io::Read` / `embedded_io::Write` are
//! expected:
//!
//! ```toml
//! [dependencies]
//! ftd2xx = { version = "0.1", features = ["embedded-io"] }
//! ```
//!
//! # Provided implementations
//!
//! | Trait | Type | Notes |
//! |-------|------|-------|
//! | `embedded_io::Read` | [`Device`] | Blocks per the native read timeout |
//! | `embedded_io::Write` | [`Device`] | May write fewer bytes than given |

use crate::context::Device;
use crate::error::Error;
use crate::types::Status;

// ---- Error conversion ----

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::ReadTimeout { .. } | Error::WriteTimeout { .. } => {
                embedded_io::ErrorKind::TimedOut
            }
            Error::Device(Status::DeviceNotOpened | Status::DeviceNotFound) => {
                embedded_io::ErrorKind::NotConnected
            }
            Error::Device(Status::InvalidParameter | Status::InvalidArgs)
            | Error::InvalidArgument(_)
            | Error::InvalidWriteLimits { .. } => embedded_io::ErrorKind::InvalidInput,
            Error::Device(Status::NotSupported) | Error::Unsupported(_) => {
                embedded_io::ErrorKind::Unsupported
            }
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

// ---- embedded-io for Device ----

impl embedded_io::ErrorType for Device {
    type Error = Error;
}

impl embedded_io::Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_into(buf)
    }
}

impl embedded_io::Write for Device {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Device::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Error as _;

    #[test]
    fn error_kind_mapping_timeouts() {
        let err = Error::ReadTimeout {
            requested: 4,
            data: Vec::new(),
        };
        assert_eq!(err.kind(), embedded_io::ErrorKind::TimedOut);

        let err = Error::WriteTimeout {
            requested: 4,
            written: 1,
        };
        assert_eq!(err.kind(), embedded_io::ErrorKind::TimedOut);
    }

    #[test]
    fn error_kind_mapping_device() {
        assert_eq!(
            Error::Device(Status::DeviceNotOpened).kind(),
            embedded_io::ErrorKind::NotConnected
        );
        assert_eq!(
            Error::Device(Status::NotSupported).kind(),
            embedded_io::ErrorKind::Unsupported
        );
        assert_eq!(
            Error::Device(Status::IoError).kind(),
            embedded_io::ErrorKind::Other
        );
    }
}
