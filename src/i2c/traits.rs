// Licensed under the Apache-2.0 license

//! # Bus controller abstraction
//!
//! The protocol logic never touches registers directly. It drives the bus
//! controller through [`I2cHardwareCore`], which exposes the few register
//! operations a polled two-wire master needs:
//!
//! ```text
//! configure / enable      clock divider and enable flag (once, at init)
//! trigger                 one action per control register write
//! is_complete             completion flag of the last triggered action
//! is_stop_pending         stop-in-progress flag (stop does not raise completion)
//! status                  raw status register, prescaler bits included
//! load_data / data        data-holding register
//! ```
//!
//! Implementations exist for the memory-mapped ATmega328P interface
//! ([`crate::i2c::atmega_twi`]) and for a software simulation
//! ([`crate::i2c::sim`]) used by the tests.

use core::convert::Infallible;

use crate::i2c::common::Command;

/// Register-level access to a two-wire bus controller.
///
/// The driver assumes exclusive ownership of the controller for the whole
/// lifetime of the implementing value. No method blocks.
pub trait I2cHardwareCore {
    /// Program the bit-rate divider with a prescaler of 1.
    fn configure(&mut self, divider: u8);

    /// Set the enable flag. Never cleared by the driver.
    fn enable(&mut self);

    /// Request exactly one action from the controller.
    ///
    /// Writing a command clears the completion flag of the previous action.
    fn trigger(&mut self, command: Command);

    /// Whether the last triggered action (other than stop) has finished.
    fn is_complete(&mut self) -> bool;

    /// Whether a stop condition is still being generated.
    fn is_stop_pending(&mut self) -> bool;

    /// Raw status register value.
    fn status(&mut self) -> u8;

    /// Load the data register before a [`Command::Transmit`].
    fn load_data(&mut self, byte: u8);

    /// Read the data register after a receive completed.
    fn data(&mut self) -> u8;

    /// Non-blocking view of [`is_complete`](Self::is_complete).
    fn poll_complete(&mut self) -> nb::Result<(), Infallible> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Non-blocking view of the stop flag being released.
    fn poll_stop_released(&mut self) -> nb::Result<(), Infallible> {
        if self.is_stop_pending() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

impl<T: I2cHardwareCore + ?Sized> I2cHardwareCore for &mut T {
    fn configure(&mut self, divider: u8) {
        (**self).configure(divider);
    }

    fn enable(&mut self) {
        (**self).enable();
    }

    fn trigger(&mut self, command: Command) {
        (**self).trigger(command);
    }

    fn is_complete(&mut self) -> bool {
        (**self).is_complete()
    }

    fn is_stop_pending(&mut self) -> bool {
        (**self).is_stop_pending()
    }

    fn status(&mut self) -> u8 {
        (**self).status()
    }

    fn load_data(&mut self, byte: u8) {
        (**self).load_data(byte);
    }

    fn data(&mut self) -> u8 {
        (**self).data()
    }
}
