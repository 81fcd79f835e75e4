// Licensed under the Apache-2.0 license

//! Polled two-wire bus master.
//!
//! [`I2cController`] owns the bus controller handle, the configuration and a
//! logger. It is constructed once, which programs the clock divider and
//! enables the controller, and is then passed by reference to whatever needs
//! the bus. Protocol steps live in [`crate::i2c::transaction`], whole
//! transfers in [`crate::i2c::transfer`].
//!
//! The controller provides no locking. In a multi-threaded host, wrap it in a
//! mutex so that one transfer runs at a time.

use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::HertzU32;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::I2cConfig;
use crate::i2c::error::Error;
use crate::i2c::system_setup::BusSetup;
use crate::i2c::traits::I2cHardwareCore;
use crate::i2c::transaction::BusState;

pub struct I2cController<H: I2cHardwareCore, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: I2cConfig,
    pub logger: L,
    pub(crate) state: BusState,
    bit_rate: HertzU32,
}

impl<H: I2cHardwareCore, L: Logger> I2cController<H, L> {
    /// Initialize the bus controller and take ownership of it.
    pub fn new(mut hardware: H, config: I2cConfig, mut logger: L) -> Self {
        let bit_rate = BusSetup::initialize(&mut hardware, &config);
        logger.debug(format_args!(
            "twi: enabled at {} Hz (requested {} Hz)",
            bit_rate.raw(),
            config.bit_rate.raw()
        ));
        Self {
            hardware,
            config,
            logger,
            state: BusState::Idle,
            bit_rate,
        }
    }

    /// Bit rate produced by the programmed divider.
    #[must_use]
    pub fn bit_rate(&self) -> HertzU32 {
        self.bit_rate
    }

    /// Current position in the per-transaction state machine.
    #[must_use]
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Give the bus controller back.
    pub fn release(self) -> H {
        self.hardware
    }
}

impl<H: I2cHardwareCore, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = Error;
}

impl<H: I2cHardwareCore, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.burst_read(addr, buffer)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.burst_write(addr, bytes)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_then_read(addr, bytes, buffer)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transaction_slice(addr, operations)
    }
}
