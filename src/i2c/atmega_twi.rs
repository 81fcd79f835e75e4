// Licensed under the Apache-2.0 license

//! ATmega328P two-wire interface.
//!
//! The register block sits in data space at `0xB8`:
//!
//! ```text
//! 0xB8 TWBR  bit-rate divider
//! 0xB9 TWSR  status (bits 7..3) and prescaler (bits 1..0)
//! 0xBA TWAR  own address, unused by a master
//! 0xBB TWDR  data
//! 0xBC TWCR  control
//! ```

use core::ptr;

use crate::i2c::common::{control, Command};
use crate::i2c::traits::I2cHardwareCore;

pub const TWI_BASE: usize = 0xB8;

const TWBR: usize = 0;
const TWSR: usize = 1;
const TWDR: usize = 3;
const TWCR: usize = 4;

/// Number of bytes the register block spans.
pub const REGISTER_SPAN: usize = 5;

pub struct Atmega328pTwi {
    base: *mut u8,
}

impl Atmega328pTwi {
    /// # Safety
    ///
    /// Must only be called on an ATmega328P, and at most once: the returned
    /// value assumes exclusive access to the TWI registers.
    #[must_use]
    pub unsafe fn new() -> Self {
        Self {
            base: TWI_BASE as *mut u8,
        }
    }

    /// # Safety
    ///
    /// `base` must point to [`REGISTER_SPAN`] bytes laid out like the TWI
    /// register block, valid for volatile reads and writes for the lifetime
    /// of the returned value and not accessed through any other path.
    #[must_use]
    pub unsafe fn from_base(base: *mut u8) -> Self {
        Self { base }
    }

    fn read(&self, offset: usize) -> u8 {
        // SAFETY: offset < REGISTER_SPAN, and the constructor contract covers
        // the whole block.
        unsafe { ptr::read_volatile(self.base.add(offset)) }
    }

    fn write(&mut self, offset: usize, value: u8) {
        // SAFETY: as for `read`.
        unsafe { ptr::write_volatile(self.base.add(offset), value) }
    }
}

impl I2cHardwareCore for Atmega328pTwi {
    fn configure(&mut self, divider: u8) {
        // prescaler 1
        self.write(TWSR, 0);
        self.write(TWBR, divider);
    }

    fn enable(&mut self) {
        self.write(TWCR, control::TWEN);
    }

    fn trigger(&mut self, command: Command) {
        self.write(TWCR, command.control_bits());
    }

    fn is_complete(&mut self) -> bool {
        self.read(TWCR) & control::TWINT != 0
    }

    fn is_stop_pending(&mut self) -> bool {
        self.read(TWCR) & control::TWSTO != 0
    }

    fn status(&mut self) -> u8 {
        self.read(TWSR)
    }

    fn load_data(&mut self, byte: u8) {
        self.write(TWDR, byte);
    }

    fn data(&mut self) -> u8 {
        self.read(TWDR)
    }
}
