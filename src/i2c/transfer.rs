// Licensed under the Apache-2.0 license

//! Whole transfers built from the transaction primitives.
//!
//! Every operation here ends with exactly one stop, whether it succeeded or
//! failed at any step, so the master never leaves the bus held. The only
//! exception is an out-of-range address, which is rejected before the bus is
//! touched.
//!
//! Partial transfers are not rolled back. Bytes written before a failure
//! stay written; bytes received before a failure stay in the caller's
//! buffer, the rest of the buffer is left untouched.

use embedded_hal::i2c::Operation;

use crate::common::Logger;
use crate::i2c::common::{Address, Direction};
use crate::i2c::error::Error;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::traits::I2cHardwareCore;
use crate::i2c::transaction::StopCondition;

impl<H: I2cHardwareCore, L: Logger> I2cController<H, L> {
    /// Write `bytes` to the peripheral in one start/stop bracket.
    ///
    /// An empty slice performs only the address phase, which is a cheap way
    /// to probe for a device.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn burst_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Error> {
        let address = Address::new(address)?;
        let result = self
            .start_write(address)
            .and_then(|()| self.send_all(bytes));
        self.finish(result)
    }

    /// Fill `buffer` from the peripheral, acknowledging every byte but the last.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn burst_read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
        let address = Address::new(address)?;
        let result = self
            .start_read(address)
            .and_then(|()| self.receive_into(buffer, true));
        self.finish(result)
    }

    /// Write `register` followed by `bytes`.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn write_register(
        &mut self,
        address: u8,
        register: u8,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let address = Address::new(address)?;
        let result = self
            .start_write(address)
            .and_then(|()| self.write_byte(register))
            .and_then(|()| self.send_all(bytes));
        self.finish(result)
    }

    /// Select `register`, then read `buffer.len()` bytes after a repeated start.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.write_then_read(address, &[register], buffer)
    }

    /// Write `bytes`, then read into `buffer` after a repeated start.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn write_then_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        let address = Address::new(address)?;
        let result = self
            .start_write(address)
            .and_then(|()| self.send_all(bytes))
            .and_then(|()| self.restart_read(address))
            .and_then(|()| self.receive_into(buffer, true));
        self.finish(result)
    }

    /// Run `operations` as one transaction.
    ///
    /// Adjacent operations of the same direction share one address phase; a
    /// change of direction issues a repeated start. The last byte of a read
    /// is not acknowledged unless more reading follows.
    ///
    /// # Errors
    ///
    /// The first failing step's error, or [`Error::InvalidAddress`].
    pub fn transaction_slice(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let address = Address::new(address)?;
        if operations.is_empty() {
            return Ok(());
        }
        let result = self.run_operations(address, operations);
        self.finish(result)
    }

    fn run_operations(
        &mut self,
        address: Address,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let mut open: Option<Direction> = None;
        let mut rest = operations;
        while let Some((operation, tail)) = core::mem::take(&mut rest).split_first_mut() {
            // Empty reads are transparent; any write, even an empty one,
            // readdresses the device and ends the read phase.
            let reading_continues = matches!(
                tail.iter().find(|op| !is_empty_read(op)),
                Some(Operation::Read(_))
            );
            match operation {
                Operation::Write(bytes) => {
                    self.select(address, Direction::Write, &mut open)?;
                    self.send_all(bytes)?;
                }
                Operation::Read(buffer) => {
                    self.select(address, Direction::Read, &mut open)?;
                    self.receive_into(buffer, !reading_continues)?;
                }
            }
            rest = tail;
        }
        Ok(())
    }

    /// Make sure the bus is addressed in `direction`.
    fn select(
        &mut self,
        address: Address,
        direction: Direction,
        open: &mut Option<Direction>,
    ) -> Result<(), Error> {
        match *open {
            Some(current) if current == direction => return Ok(()),
            Some(_) => self.repeated_start()?,
            None => self.start()?,
        }
        self.send_address(address, direction)?;
        *open = Some(direction);
        Ok(())
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Receive into `buffer`; the final byte is NACKed when `last` is set.
    fn receive_into(&mut self, buffer: &mut [u8], last: bool) -> Result<(), Error> {
        let Some((final_byte, head)) = buffer.split_last_mut() else {
            return Ok(());
        };
        for slot in head {
            *slot = self.read_byte_ack()?;
        }
        *final_byte = if last {
            self.read_byte_nack()?
        } else {
            self.read_byte_ack()?
        };
        Ok(())
    }

    /// Release the bus and pick the result reported to the caller.
    fn finish(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        let stop = self.stop();
        match result {
            Ok(()) if stop == StopCondition::NotConfirmed && self.config.strict_stop => {
                Err(Error::StopNotConfirmed)
            }
            other => other,
        }
    }
}

fn is_empty_read(operation: &Operation<'_>) -> bool {
    matches!(operation, Operation::Read(buffer) if buffer.is_empty())
}
