// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI master driver.
//!
//! This module provides the bus configuration, the peripheral address type,
//! and the control/status bit layout shared by the hardware backends.

use fugit::HertzU32;

use crate::i2c::error::Error;

/// Reference clock assumed when none is configured (16 MHz crystal).
pub const DEFAULT_REFERENCE_CLOCK_HZ: u32 = 16_000_000;

/// Polling iterations allowed per blocking step.
///
/// This bounds work, not wall-clock time: it assumes one iteration of the
/// polling loop costs roughly the same on every call.
pub const DEFAULT_TIMEOUT_BUDGET: u32 = 60_000;

/// Control register bits.
pub mod control {
    /// Completion flag; writing 1 clears it and starts the next action.
    pub const TWINT: u8 = 0x80;
    /// Acknowledge received bytes.
    pub const TWEA: u8 = 0x40;
    pub const TWSTA: u8 = 0x20;
    pub const TWSTO: u8 = 0x10;
    pub const TWEN: u8 = 0x04;
}

/// Mask selecting the significant (top five) bits of the status register.
pub const STATUS_MASK: u8 = 0xF8;

/// Mask selecting the prescaler bits of the status register.
pub const PRESCALER_MASK: u8 = 0x03;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn hertz(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// One action requested from the bus controller through the control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Generate a start condition (also used for repeated start).
    Start,
    /// Generate a stop condition.
    Stop,
    /// Shift out the byte loaded in the data register.
    Transmit,
    /// Receive a byte and acknowledge it (more data wanted).
    ReceiveAck,
    /// Receive a byte and answer with not-acknowledge (last byte).
    ReceiveNack,
}

impl Command {
    /// Control register value requesting this action.
    #[must_use]
    pub const fn control_bits(self) -> u8 {
        use control::{TWEA, TWEN, TWINT, TWSTA, TWSTO};
        match self {
            Command::Start => TWINT | TWSTA | TWEN,
            Command::Stop => TWINT | TWSTO | TWEN,
            Command::Transmit | Command::ReceiveNack => TWINT | TWEN,
            Command::ReceiveAck => TWINT | TWEN | TWEA,
        }
    }
}

/// Transfer direction, encoded in the lowest bit of the address byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// A validated 7-bit peripheral address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    pub const MAX: u8 = 0x7F;

    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for values above 127.
    pub const fn new(raw: u8) -> Result<Self, Error> {
        if raw > Self::MAX {
            Err(Error::InvalidAddress(raw))
        } else {
            Ok(Self(raw))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Byte placed on the bus during the address phase.
    #[must_use]
    pub const fn with_direction(self, direction: Direction) -> u8 {
        (self.0 << 1) | direction as u8
    }
}

impl TryFrom<u8> for Address {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    pub reference_clock: HertzU32,
    pub bit_rate: HertzU32,
    /// Polling budget for every blocking step, see [`DEFAULT_TIMEOUT_BUDGET`].
    pub timeout: u32,
    /// Report an unconfirmed stop as an error on otherwise successful transfers.
    pub strict_stop: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    reference_clock: HertzU32,
    bit_rate: HertzU32,
    timeout: u32,
    strict_stop: bool,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reference_clock: HertzU32::from_raw(DEFAULT_REFERENCE_CLOCK_HZ),
            bit_rate: I2cSpeed::Standard.hertz(),
            timeout: DEFAULT_TIMEOUT_BUDGET,
            strict_stop: false,
        }
    }
    #[must_use]
    pub fn reference_clock(mut self, clock: HertzU32) -> Self {
        self.reference_clock = clock;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.bit_rate = speed.hertz();
        self
    }
    #[must_use]
    pub fn bit_rate(mut self, rate: HertzU32) -> Self {
        self.bit_rate = rate;
        self
    }
    #[must_use]
    pub fn timeout(mut self, budget: u32) -> Self {
        self.timeout = budget;
        self
    }
    #[must_use]
    pub fn strict_stop(mut self, enabled: bool) -> Self {
        self.strict_stop = enabled;
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            reference_clock: self.reference_clock,
            bit_rate: self.bit_rate,
            timeout: self.timeout,
            strict_stop: self.strict_stop,
        }
    }
}
