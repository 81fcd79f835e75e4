// Licensed under the Apache-2.0 license

//! Status decoder.
//!
//! Maps the raw status register value observed after a completed action to
//! the outcome of the [`Step`] that was performed. The mapping is total: a
//! code that is not listed for the step is always a protocol error.

use crate::i2c::common::STATUS_MASK;
use crate::i2c::error::{Error, Fault, NackSource};

/// Status codes of the master transmitter/receiver modes (prescaler masked).
pub mod codes {
    pub const BUS_ERROR: u8 = 0x00;
    pub const START: u8 = 0x08;
    pub const REPEATED_START: u8 = 0x10;

    pub const MT_SLA_ACK: u8 = 0x18;
    pub const MT_SLA_NACK: u8 = 0x20;
    pub const MT_DATA_ACK: u8 = 0x28;
    pub const MT_DATA_NACK: u8 = 0x30;
    /// Arbitration lost in SLA+W/data (transmitter) or SLA+R/NACK (receiver).
    pub const ARBITRATION_LOST: u8 = 0x38;

    pub const MR_SLA_ACK: u8 = 0x40;
    pub const MR_SLA_NACK: u8 = 0x48;
    pub const MR_DATA_ACK: u8 = 0x50;
    pub const MR_DATA_NACK: u8 = 0x58;

    /// No relevant state information; the controller is idle.
    pub const NO_INFO: u8 = 0xF8;
}

/// Protocol step whose completion status is being classified.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Start,
    RepeatedStart,
    AddressWrite,
    AddressRead,
    DataWrite,
    ReceiveAck,
    ReceiveNack,
}

impl Step {
    /// Codes meaning the step succeeded.
    #[must_use]
    pub const fn success(self) -> &'static [u8] {
        match self {
            Step::Start => &[codes::START],
            Step::RepeatedStart => &[codes::START, codes::REPEATED_START],
            Step::AddressWrite => &[codes::MT_SLA_ACK],
            Step::AddressRead => &[codes::MR_SLA_ACK],
            Step::DataWrite => &[codes::MT_DATA_ACK],
            Step::ReceiveAck => &[codes::MR_DATA_ACK],
            Step::ReceiveNack => &[codes::MR_DATA_NACK],
        }
    }

    /// Code meaning the receiver answered with not-acknowledge, if the step
    /// has one.
    #[must_use]
    pub const fn expected_failure(self) -> Option<(u8, NackSource)> {
        match self {
            Step::AddressWrite => Some((codes::MT_SLA_NACK, NackSource::Address)),
            Step::AddressRead => Some((codes::MR_SLA_NACK, NackSource::Address)),
            Step::DataWrite => Some((codes::MT_DATA_NACK, NackSource::Data)),
            _ => None,
        }
    }
}

/// Significant bits of a raw status register value.
#[must_use]
pub const fn masked(raw: u8) -> u8 {
    raw & STATUS_MASK
}

/// Classify a code that is neither the success nor the expected failure.
#[must_use]
pub const fn fault(code: u8) -> Fault {
    match code {
        codes::ARBITRATION_LOST => Fault::ArbitrationLost,
        codes::BUS_ERROR => Fault::BusError,
        other => Fault::Unexpected(other),
    }
}

/// Decode `raw` for `step`.
///
/// # Errors
///
/// - [`Error::NoAcknowledge`] if the status is the step's expected failure.
/// - [`Error::Protocol`] for arbitration loss, bus error, or any other code.
pub fn decode(raw: u8, step: Step) -> Result<(), Error> {
    let code = masked(raw);
    if step.success().contains(&code) {
        return Ok(());
    }
    match step.expected_failure() {
        Some((nack, source)) if nack == code => Err(Error::NoAcknowledge(source)),
        _ => Err(Error::Protocol(fault(code))),
    }
}
