// Licensed under the Apache-2.0 license

//! Failure taxonomy of the TWI master.
//!
//! A step either succeeds (`Ok`) or yields exactly one [`Error`]. The
//! protocol-level classes are `NoAcknowledge`, `Protocol` and `Timeout`; the
//! [`Fault`] carried by `Protocol` only refines the class for diagnostics.

use core::convert::Infallible;
use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Bus phase during which a not-acknowledge was observed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NackSource {
    /// Nobody answered the address byte.
    Address,
    /// The peripheral rejected a data byte.
    Data,
}

/// Fatal protocol condition reported by the status register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    ArbitrationLost,
    /// Illegal start/stop detected on the bus.
    BusError,
    /// Status code that is not valid for the step that was performed.
    Unexpected(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    NoAcknowledge(NackSource),
    Protocol(Fault),
    /// The completion flag was not raised within the polling budget.
    Timeout,
    /// The stop flag was still set after the polling budget. Only reported
    /// when strict stop checking is configured.
    StopNotConfirmed,
    InvalidAddress(u8),
}

impl Error {
    #[must_use]
    pub const fn is_nack(&self) -> bool {
        matches!(self, Error::NoAcknowledge(_))
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoAcknowledge(NackSource::Address) => f.write_str("address not acknowledged"),
            Error::NoAcknowledge(NackSource::Data) => f.write_str("data not acknowledged"),
            Error::Protocol(Fault::ArbitrationLost) => f.write_str("arbitration lost"),
            Error::Protocol(Fault::BusError) => f.write_str("bus error"),
            Error::Protocol(Fault::Unexpected(code)) => {
                write!(f, "unexpected bus status {code:#04x}")
            }
            Error::Timeout => f.write_str("bus controller timed out"),
            Error::StopNotConfirmed => f.write_str("stop condition not confirmed"),
            Error::InvalidAddress(raw) => write!(f, "invalid 7-bit address {raw:#04x}"),
        }
    }
}

impl core::error::Error for Error {}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NoAcknowledge(NackSource::Address) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::NoAcknowledge(NackSource::Data) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Error::Protocol(Fault::ArbitrationLost) => ErrorKind::ArbitrationLoss,
            Error::Protocol(Fault::BusError) => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error as _;

    #[test]
    fn maps_to_embedded_hal_kinds() {
        assert_eq!(
            Error::NoAcknowledge(NackSource::Address).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::NoAcknowledge(NackSource::Data).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(
            Error::Protocol(Fault::ArbitrationLost).kind(),
            ErrorKind::ArbitrationLoss
        );
        assert_eq!(Error::Protocol(Fault::BusError).kind(), ErrorKind::Bus);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Other);
        assert_eq!(Error::Protocol(Fault::Unexpected(0x68)).kind(), ErrorKind::Other);
    }

    #[test]
    fn display_includes_status_code() {
        let text = std::format!("{}", Error::Protocol(Fault::Unexpected(0x68)));
        assert_eq!(text, "unexpected bus status 0x68");
    }
}
