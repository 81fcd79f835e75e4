// Licensed under the Apache-2.0 license

//! Transaction primitives.
//!
//! Each primitive performs one protocol step: it triggers the action, waits
//! for the completion flag within the configured polling budget, and checks
//! the status register before reporting success. Nothing is retried.
//!
//! ```text
//! Idle -> StartIssued -> AddressAcked -> DataPhase* -> (stop) -> Idle
//! ```
//!
//! The primitives do not issue stop on failure; that is the job of the
//! transfer operations in [`crate::i2c::transfer`].

use crate::common::Logger;
use crate::i2c::common::{Address, Command, Direction};
use crate::i2c::error::Error;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::status::{self, Step};
use crate::i2c::timeout::poll_bounded;
use crate::i2c::traits::I2cHardwareCore;

/// Position of the master in the current transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    Idle,
    StartIssued,
    AddressAcked(Direction),
    DataPhase(Direction),
}

/// Result of waiting for the stop condition to be released.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopCondition {
    Released,
    /// The stop flag was still set when the polling budget ran out. The stop
    /// has been requested and the master no longer drives the bus, but the
    /// controller never confirmed the bus went idle.
    NotConfirmed,
}

impl<H: I2cHardwareCore, L: Logger> I2cController<H, L> {
    /// Trigger `command`, wait for completion and decode the status for `step`.
    fn execute(&mut self, command: Command, step: Step) -> Result<(), Error> {
        self.hardware.trigger(command);

        let budget = self.config.timeout;
        let hardware = &mut self.hardware;
        if let Err(err) = poll_bounded(budget, || hardware.poll_complete()) {
            self.logger
                .error(format_args!("twi: {step:?} not complete after {budget} polls"));
            return Err(err);
        }

        let raw = self.hardware.status();
        match status::decode(raw, step) {
            Ok(()) => Ok(()),
            Err(err @ Error::NoAcknowledge(_)) => {
                self.logger
                    .debug(format_args!("twi: {step:?} not acknowledged ({raw:#04x})"));
                Err(err)
            }
            Err(err) => {
                self.logger
                    .error(format_args!("twi: {step:?} failed: {err} ({raw:#04x})"));
                Err(err)
            }
        }
    }

    /// Generate a start condition. Only the "start" status is accepted.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn start(&mut self) -> Result<(), Error> {
        self.execute(Command::Start, Step::Start)?;
        self.state = BusState::StartIssued;
        Ok(())
    }

    /// Generate a repeated start. Accepts both the "start" and the
    /// "repeated start" status.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn repeated_start(&mut self) -> Result<(), Error> {
        self.execute(Command::Start, Step::RepeatedStart)?;
        self.state = BusState::StartIssued;
        Ok(())
    }

    /// Address phase: shift out `address` with the direction bit.
    ///
    /// # Errors
    ///
    /// [`Error::NoAcknowledge`] if no peripheral answered, otherwise
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn send_address(&mut self, address: Address, direction: Direction) -> Result<(), Error> {
        let step = match direction {
            Direction::Write => Step::AddressWrite,
            Direction::Read => Step::AddressRead,
        };
        self.hardware.load_data(address.with_direction(direction));
        self.execute(Command::Transmit, step)?;
        self.state = BusState::AddressAcked(direction);
        Ok(())
    }

    /// Transmit one data byte.
    ///
    /// # Errors
    ///
    /// [`Error::NoAcknowledge`] if the peripheral rejected the byte, otherwise
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.hardware.load_data(byte);
        self.execute(Command::Transmit, Step::DataWrite)?;
        self.state = BusState::DataPhase(Direction::Write);
        Ok(())
    }

    /// Receive a byte and acknowledge it, asking the peripheral for more.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn read_byte_ack(&mut self) -> Result<u8, Error> {
        self.receive(Command::ReceiveAck, Step::ReceiveAck)
    }

    /// Receive the final byte of a read and answer with not-acknowledge.
    ///
    /// Ending a read with an acknowledge makes the peripheral keep driving
    /// the data line for another byte, which blocks the stop condition.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] or [`Error::Timeout`].
    pub fn read_byte_nack(&mut self) -> Result<u8, Error> {
        self.receive(Command::ReceiveNack, Step::ReceiveNack)
    }

    fn receive(&mut self, command: Command, step: Step) -> Result<u8, Error> {
        self.execute(command, step)?;
        self.state = BusState::DataPhase(Direction::Read);
        Ok(self.hardware.data())
    }

    /// Generate a stop condition and wait for the controller to release it.
    ///
    /// The stop does not raise the completion flag; the stop flag itself is
    /// polled instead. Safe to call on an idle bus.
    pub fn stop(&mut self) -> StopCondition {
        self.hardware.trigger(Command::Stop);

        let budget = self.config.timeout;
        let hardware = &mut self.hardware;
        let released = poll_bounded(budget, || hardware.poll_stop_released()).is_ok();
        self.state = BusState::Idle;

        if released {
            StopCondition::Released
        } else {
            self.logger
                .warn(format_args!("twi: stop still pending after {budget} polls"));
            StopCondition::NotConfirmed
        }
    }

    /// Start followed by the address phase in write direction.
    ///
    /// # Errors
    ///
    /// The first failing step's error.
    pub fn start_write(&mut self, address: Address) -> Result<(), Error> {
        self.start()?;
        self.send_address(address, Direction::Write)
    }

    /// Start followed by the address phase in read direction.
    ///
    /// # Errors
    ///
    /// The first failing step's error.
    pub fn start_read(&mut self, address: Address) -> Result<(), Error> {
        self.start()?;
        self.send_address(address, Direction::Read)
    }

    /// Repeated start followed by the address phase in write direction.
    ///
    /// # Errors
    ///
    /// The first failing step's error.
    pub fn restart_write(&mut self, address: Address) -> Result<(), Error> {
        self.repeated_start()?;
        self.send_address(address, Direction::Write)
    }

    /// Repeated start followed by the address phase in read direction.
    ///
    /// # Errors
    ///
    /// The first failing step's error.
    pub fn restart_read(&mut self, address: Address) -> Result<(), Error> {
        self.repeated_start()?;
        self.send_address(address, Direction::Read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NoOpLogger;
    use crate::i2c::common::I2cConfigBuilder;
    use crate::i2c::error::{Fault, NackSource};
    use crate::i2c::sim::{BusEvent, Injection, SimPeripheral, SimulatedBus};
    use crate::i2c::status::codes;
    use proptest::prelude::*;

    fn controller(bus: &mut SimulatedBus) -> I2cController<&mut SimulatedBus> {
        let config = I2cConfigBuilder::new().timeout(50).build();
        I2cController::new(bus, config, NoOpLogger)
    }

    fn addr(raw: u8) -> Address {
        Address::new(raw).unwrap()
    }

    #[test]
    fn start_then_repeated_start() {
        let mut bus = SimulatedBus::new();
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.start(), Ok(()));
        assert_eq!(i2c.state(), BusState::StartIssued);
        assert_eq!(i2c.repeated_start(), Ok(()));
        drop(i2c);

        assert_eq!(bus.events(), [BusEvent::Start, BusEvent::RepeatedStart]);
    }

    #[test]
    fn plain_start_rejects_repeated_start_status() {
        let mut bus = SimulatedBus::new();
        let mut i2c = controller(&mut bus);

        i2c.start().unwrap();
        assert_eq!(
            i2c.start(),
            Err(Error::Protocol(Fault::Unexpected(codes::REPEATED_START)))
        );
    }

    #[test]
    fn start_reports_arbitration_loss() {
        let mut bus = SimulatedBus::new();
        bus.inject(0, Injection::Status(codes::ARBITRATION_LOST));
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.start(), Err(Error::Protocol(Fault::ArbitrationLost)));
        assert_eq!(i2c.state(), BusState::Idle);
    }

    #[test]
    fn start_times_out_when_controller_stalls() {
        let mut bus = SimulatedBus::new();
        bus.inject(0, Injection::Stall);
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.start(), Err(Error::Timeout));
        drop(i2c);
        assert_eq!(bus.polls(), 50);
    }

    #[test]
    fn completion_latency_within_budget() {
        let mut bus = SimulatedBus::new();
        bus.set_latency(49);
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.start(), Ok(()));
    }

    #[test]
    fn completion_latency_beyond_budget() {
        let mut bus = SimulatedBus::new();
        bus.set_latency(50);
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.start(), Err(Error::Timeout));
    }

    #[test]
    fn address_nack_when_nobody_answers() {
        let mut bus = SimulatedBus::new();
        let mut i2c = controller(&mut bus);

        assert_eq!(
            i2c.start_write(addr(0x29)),
            Err(Error::NoAcknowledge(NackSource::Address))
        );
        assert_eq!(i2c.state(), BusState::StartIssued);
        assert_eq!(
            i2c.restart_read(addr(0x29)),
            Err(Error::NoAcknowledge(NackSource::Address))
        );
    }

    #[test]
    fn read_bytes_with_ack_then_nack() {
        let mut bus = SimulatedBus::new();
        let mut dev = SimPeripheral::new(0x48);
        dev.load(0x00, &[0x12, 0x34]);
        bus.attach(dev);
        let mut i2c = controller(&mut bus);

        i2c.start_read(addr(0x48)).unwrap();
        assert_eq!(i2c.state(), BusState::AddressAcked(Direction::Read));
        assert_eq!(i2c.read_byte_ack(), Ok(0x12));
        assert_eq!(i2c.read_byte_nack(), Ok(0x34));
        assert_eq!(i2c.state(), BusState::DataPhase(Direction::Read));
        assert_eq!(i2c.stop(), StopCondition::Released);
        assert_eq!(i2c.state(), BusState::Idle);
        drop(i2c);

        assert_eq!(
            bus.events(),
            [
                BusEvent::Start,
                BusEvent::Address(0x91),
                BusEvent::ReadAck(0x12),
                BusEvent::ReadNack(0x34),
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn data_nack_is_reported() {
        let mut bus = SimulatedBus::new();
        bus.attach(SimPeripheral::new(0x20).nack_data_after(1));
        let mut i2c = controller(&mut bus);

        i2c.start_write(addr(0x20)).unwrap();
        assert_eq!(i2c.write_byte(0x01), Ok(()));
        assert_eq!(
            i2c.write_byte(0x02),
            Err(Error::NoAcknowledge(NackSource::Data))
        );
    }

    #[test]
    fn stop_on_idle_bus_returns() {
        let mut bus = SimulatedBus::new();
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.stop(), StopCondition::Released);
        assert_eq!(i2c.stop(), StopCondition::Released);
    }

    #[test]
    fn stuck_stop_is_bounded() {
        let mut bus = SimulatedBus::new();
        bus.set_stop_stuck(true);
        let mut i2c = controller(&mut bus);

        assert_eq!(i2c.stop(), StopCondition::NotConfirmed);
        assert_eq!(i2c.state(), BusState::Idle);
        drop(i2c);
        assert_eq!(bus.polls(), 50);
    }

    proptest! {
        #[test]
        fn address_phase_for_every_seven_bit_address(raw in 0u8..=0x7F, present in any::<bool>()) {
            let mut bus = SimulatedBus::new();
            if present {
                bus.attach(SimPeripheral::new(raw));
            }
            let mut i2c = controller(&mut bus);

            let write = i2c.start_write(addr(raw));
            let read = i2c.restart_read(addr(raw));
            let _ = i2c.stop();
            drop(i2c);

            if present {
                prop_assert_eq!(write, Ok(()));
                prop_assert_eq!(read, Ok(()));
            } else {
                prop_assert_eq!(write, Err(Error::NoAcknowledge(NackSource::Address)));
                prop_assert_eq!(read, Err(Error::NoAcknowledge(NackSource::Address)));
            }
            prop_assert_eq!(bus.events().get(1), Some(&BusEvent::Address(raw << 1)));
            prop_assert_eq!(bus.events().get(3), Some(&BusEvent::Address((raw << 1) | 1)));
        }

        #[test]
        fn address_phase_unknown_status_is_protocol_error(status in any::<u8>()) {
            let code = status & 0xF8;
            prop_assume!(code != codes::MT_SLA_ACK && code != codes::MT_SLA_NACK);
            let mut bus = SimulatedBus::new();
            bus.attach(SimPeripheral::new(0x50));
            bus.inject(1, Injection::Status(status));
            let mut i2c = controller(&mut bus);

            i2c.start().unwrap();
            let result = i2c.send_address(addr(0x50), Direction::Write);
            prop_assert!(matches!(result, Err(Error::Protocol(_))));
        }
    }
}
