// Licensed under the Apache-2.0 license

//! Software bus controller.
//!
//! [`SimulatedBus`] implements [`I2cHardwareCore`] without hardware, so the
//! protocol logic can be exercised on the host. It behaves like the
//! ATmega-style controller the driver targets:
//!
//! - a start on an idle bus reports `START`, on a held bus `REPEATED_START`;
//! - the first transmit after a start is the address phase, acknowledged if
//!   a [`SimPeripheral`] with that address is attached;
//! - writes and reads go to the selected peripheral's register memory;
//! - a stop never raises the completion flag and returns the status to
//!   `NO_INFO`.
//!
//! Completion can be delayed by a number of polls, a stop can be made to
//! hang, and individual triggers can be forced to report a given status or
//! to never complete. Every bus action is recorded as a [`BusEvent`].

use heapless::Vec;

use crate::i2c::common::{Command, Direction, PRESCALER_MASK};
use crate::i2c::status::codes;
use crate::i2c::traits::I2cHardwareCore;

pub const MAX_PERIPHERALS: usize = 4;
pub const MAX_INJECTIONS: usize = 8;
/// Events beyond this count are not recorded, see [`SimulatedBus::overflowed`].
pub const EVENT_CAPACITY: usize = 64;

/// What the bus saw, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    Start,
    RepeatedStart,
    /// Address byte, direction bit included.
    Address(u8),
    Write(u8),
    ReadAck(u8),
    ReadNack(u8),
    Stop,
}

/// Fault forced onto one trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Injection {
    /// Report this raw status once the action completes.
    Status(u8),
    /// Never raise the completion flag (or never release a stop).
    Stall,
}

/// A register-pointer peripheral: the first byte written in a transaction
/// selects the register, further bytes are stored there with auto-increment,
/// reads continue from the current pointer.
#[derive(Clone, Debug)]
pub struct SimPeripheral {
    address: u8,
    memory: [u8; 256],
    pointer: u8,
    pointer_pending: bool,
    accepted: usize,
    data_limit: Option<usize>,
}

impl SimPeripheral {
    #[must_use]
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 256],
            pointer: 0,
            pointer_pending: false,
            accepted: 0,
            data_limit: None,
        }
    }

    /// NACK every data byte after the first `count` of a write transaction.
    #[must_use]
    pub fn nack_data_after(mut self, count: usize) -> Self {
        self.data_limit = Some(count);
        self
    }

    /// Preset register contents starting at `offset` (wrapping).
    pub fn load(&mut self, offset: u8, bytes: &[u8]) {
        let mut index = offset;
        for &byte in bytes {
            if let Some(slot) = self.memory.get_mut(usize::from(index)) {
                *slot = byte;
            }
            index = index.wrapping_add(1);
        }
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Register contents; empty if the range runs past the end.
    #[must_use]
    pub fn memory(&self, offset: u8, len: usize) -> &[u8] {
        let start = usize::from(offset);
        start
            .checked_add(len)
            .and_then(|end| self.memory.get(start..end))
            .unwrap_or(&[])
    }

    fn begin(&mut self, direction: Direction) {
        if direction == Direction::Write {
            self.pointer_pending = true;
            self.accepted = 0;
        }
    }

    fn accept(&mut self, byte: u8) -> bool {
        if self.data_limit.is_some_and(|limit| self.accepted >= limit) {
            return false;
        }
        self.accepted += 1;
        if self.pointer_pending {
            self.pointer_pending = false;
            self.pointer = byte;
        } else {
            if let Some(slot) = self.memory.get_mut(usize::from(self.pointer)) {
                *slot = byte;
            }
            self.pointer = self.pointer.wrapping_add(1);
        }
        true
    }

    fn next_byte(&mut self) -> u8 {
        let byte = self
            .memory
            .get(usize::from(self.pointer))
            .copied()
            .unwrap_or(0xFF);
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Start sent, next transmit is the address byte.
    Addressing,
    Transmitting,
    Receiving,
}

pub struct SimulatedBus {
    divider: Option<u8>,
    prescaler_bits: u8,
    enabled: bool,
    status: u8,
    data: u8,
    phase: Phase,
    selected: Option<usize>,
    triggered: bool,
    remaining: u32,
    latency: u32,
    stalled: bool,
    stop_pending: bool,
    stop_stuck: bool,
    triggers: usize,
    polls: u32,
    peripherals: Vec<SimPeripheral, MAX_PERIPHERALS>,
    injections: Vec<(usize, Injection), MAX_INJECTIONS>,
    events: Vec<BusEvent, EVENT_CAPACITY>,
    overflowed: bool,
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            divider: None,
            prescaler_bits: 0,
            enabled: false,
            status: codes::NO_INFO,
            data: 0xFF,
            phase: Phase::Idle,
            selected: None,
            triggered: false,
            remaining: 0,
            latency: 0,
            stalled: false,
            stop_pending: false,
            stop_stuck: false,
            triggers: 0,
            polls: 0,
            peripherals: Vec::new(),
            injections: Vec::new(),
            events: Vec::new(),
            overflowed: false,
        }
    }

    /// Attach a peripheral, replacing one with the same address. Ignored
    /// once [`MAX_PERIPHERALS`] are attached.
    pub fn attach(&mut self, peripheral: SimPeripheral) {
        if let Some(existing) = self
            .peripherals
            .iter_mut()
            .find(|p| p.address == peripheral.address)
        {
            *existing = peripheral;
        } else {
            let _ = self.peripherals.push(peripheral);
        }
    }

    /// Force `injection` onto the trigger with zero-based index `at`.
    pub fn inject(&mut self, at: usize, injection: Injection) {
        let _ = self.injections.push((at, injection));
    }

    /// Number of polls the completion flag stays clear after each action.
    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Keep the stop flag set forever.
    pub fn set_stop_stuck(&mut self, stuck: bool) {
        self.stop_stuck = stuck;
    }

    /// Report these prescaler bits alongside every status.
    pub fn set_prescaler_bits(&mut self, bits: u8) {
        self.prescaler_bits = bits & PRESCALER_MASK;
    }

    #[must_use]
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Empty the event log and reset the overflow flag.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.overflowed = false;
    }

    /// Whether events were dropped because the log was full.
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Completion and stop flag reads so far.
    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls
    }

    #[must_use]
    pub fn triggers(&self) -> usize {
        self.triggers
    }

    #[must_use]
    pub fn divider(&self) -> Option<u8> {
        self.divider
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn peripheral(&self, address: u8) -> Option<&SimPeripheral> {
        self.peripherals.iter().find(|p| p.address == address)
    }

    fn record(&mut self, event: BusEvent) {
        if self.events.push(event).is_err() {
            self.overflowed = true;
        }
    }

    fn selected_mut(&mut self) -> Option<&mut SimPeripheral> {
        self.selected.and_then(|i| self.peripherals.get_mut(i))
    }

    fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.record(BusEvent::Start);
            self.status = codes::START;
        } else {
            self.record(BusEvent::RepeatedStart);
            self.status = codes::REPEATED_START;
        }
        self.phase = Phase::Addressing;
        self.selected = None;
    }

    fn stop(&mut self) {
        self.record(BusEvent::Stop);
        self.status = codes::NO_INFO;
        self.phase = Phase::Idle;
        self.selected = None;
        self.stop_pending = true;
    }

    fn transmit(&mut self) {
        let byte = self.data;
        match self.phase {
            Phase::Addressing => self.address(byte),
            Phase::Transmitting => {
                self.record(BusEvent::Write(byte));
                let acked = self.selected_mut().is_some_and(|p| p.accept(byte));
                self.status = if acked {
                    codes::MT_DATA_ACK
                } else {
                    codes::MT_DATA_NACK
                };
            }
            Phase::Idle | Phase::Receiving => {
                self.record(BusEvent::Write(byte));
                self.status = codes::NO_INFO;
            }
        }
    }

    fn address(&mut self, byte: u8) {
        self.record(BusEvent::Address(byte));
        let direction = if byte & 1 == 0 {
            Direction::Write
        } else {
            Direction::Read
        };
        let target = byte >> 1;
        self.selected = self.peripherals.iter().position(|p| p.address == target);
        let acked = match self.selected_mut() {
            Some(peripheral) => {
                peripheral.begin(direction);
                true
            }
            None => false,
        };
        (self.phase, self.status) = match (direction, acked) {
            (Direction::Write, true) => (Phase::Transmitting, codes::MT_SLA_ACK),
            (Direction::Write, false) => (Phase::Transmitting, codes::MT_SLA_NACK),
            (Direction::Read, true) => (Phase::Receiving, codes::MR_SLA_ACK),
            (Direction::Read, false) => (Phase::Receiving, codes::MR_SLA_NACK),
        };
    }

    fn receive(&mut self, ack: bool) {
        let byte = if self.phase == Phase::Receiving {
            self.selected_mut().map_or(0xFF, SimPeripheral::next_byte)
        } else {
            0xFF
        };
        self.data = byte;
        if ack {
            self.record(BusEvent::ReadAck(byte));
        } else {
            self.record(BusEvent::ReadNack(byte));
        }
        self.status = match (self.phase, ack) {
            (Phase::Receiving, true) => codes::MR_DATA_ACK,
            (Phase::Receiving, false) => codes::MR_DATA_NACK,
            _ => codes::NO_INFO,
        };
    }
}

impl I2cHardwareCore for SimulatedBus {
    fn configure(&mut self, divider: u8) {
        self.divider = Some(divider);
        self.prescaler_bits = 0;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn trigger(&mut self, command: Command) {
        let index = self.triggers;
        self.triggers += 1;
        self.triggered = false;
        self.stalled = false;
        if !self.enabled {
            return;
        }

        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Transmit => self.transmit(),
            Command::ReceiveAck => self.receive(true),
            Command::ReceiveNack => self.receive(false),
        }

        let injection = self
            .injections
            .iter()
            .find(|(at, _)| *at == index)
            .map(|&(_, injection)| injection);
        match injection {
            Some(Injection::Status(code)) => self.status = code,
            Some(Injection::Stall) => self.stalled = true,
            None => {}
        }

        if command != Command::Stop {
            self.triggered = true;
            self.remaining = self.latency;
        }
    }

    fn is_complete(&mut self) -> bool {
        self.polls += 1;
        if !self.triggered || self.stalled {
            return false;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return false;
        }
        true
    }

    fn is_stop_pending(&mut self) -> bool {
        self.polls += 1;
        if self.stop_pending && !self.stop_stuck && !self.stalled {
            self.stop_pending = false;
        }
        self.stop_pending
    }

    fn status(&mut self) -> u8 {
        self.status | self.prescaler_bits
    }

    fn load_data(&mut self, byte: u8) {
        self.data = byte;
    }

    fn data(&mut self) -> u8 {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_bus() -> SimulatedBus {
        let mut bus = SimulatedBus::new();
        bus.configure(72);
        bus.enable();
        bus
    }

    #[test]
    fn disabled_controller_never_completes() {
        let mut bus = SimulatedBus::new();
        bus.trigger(Command::Start);
        assert!(!bus.is_complete());
        assert!(bus.events().is_empty());
    }

    #[test]
    fn start_codes_depend_on_bus_state() {
        let mut bus = enabled_bus();
        bus.trigger(Command::Start);
        assert!(bus.is_complete());
        assert_eq!(bus.status(), codes::START);

        bus.trigger(Command::Start);
        assert_eq!(bus.status(), codes::REPEATED_START);

        bus.trigger(Command::Stop);
        assert_eq!(bus.status(), codes::NO_INFO);
        assert!(!bus.is_stop_pending());
        bus.trigger(Command::Start);
        assert_eq!(bus.status(), codes::START);
    }

    #[test]
    fn stop_does_not_raise_completion() {
        let mut bus = enabled_bus();
        bus.trigger(Command::Stop);
        assert!(!bus.is_complete());
    }

    #[test]
    fn register_pointer_semantics() {
        let mut bus = enabled_bus();
        bus.attach(SimPeripheral::new(0x50));

        bus.trigger(Command::Start);
        bus.load_data(0xA0);
        bus.trigger(Command::Transmit);
        assert_eq!(bus.status(), codes::MT_SLA_ACK);
        for byte in [0x08, 0xC0, 0xFF] {
            bus.load_data(byte);
            bus.trigger(Command::Transmit);
            assert_eq!(bus.status(), codes::MT_DATA_ACK);
        }

        let dev = bus.peripheral(0x50).unwrap();
        assert_eq!(dev.memory(0x08, 2), [0xC0, 0xFF]);
        assert_eq!(dev.pointer(), 0x0A);
    }

    #[test]
    fn read_from_absent_device_is_nacked() {
        let mut bus = enabled_bus();
        bus.trigger(Command::Start);
        bus.load_data(0x91);
        bus.trigger(Command::Transmit);
        assert_eq!(bus.status(), codes::MR_SLA_NACK);
    }

    #[test]
    fn latency_delays_completion() {
        let mut bus = enabled_bus();
        bus.set_latency(2);
        bus.trigger(Command::Start);
        assert!(!bus.is_complete());
        assert!(!bus.is_complete());
        assert!(bus.is_complete());
        assert_eq!(bus.polls(), 3);
    }

    #[test]
    fn injections_apply_to_one_trigger() {
        let mut bus = enabled_bus();
        bus.inject(0, Injection::Status(codes::ARBITRATION_LOST));
        bus.inject(1, Injection::Stall);

        bus.trigger(Command::Start);
        assert_eq!(bus.status(), codes::ARBITRATION_LOST);
        bus.trigger(Command::Start);
        assert!(!bus.is_complete());
        bus.trigger(Command::Start);
        assert!(bus.is_complete());
        assert_eq!(bus.triggers(), 3);
    }

    #[test]
    fn prescaler_bits_show_in_status() {
        let mut bus = enabled_bus();
        bus.set_prescaler_bits(0x01);
        bus.trigger(Command::Start);
        assert_eq!(bus.status(), codes::START | 0x01);
    }

    #[test]
    fn memory_range_past_the_end_is_empty() {
        let dev = SimPeripheral::new(0x20);
        assert_eq!(dev.address(), 0x20);
        assert_eq!(dev.memory(0xFF, 1).len(), 1);
        assert!(dev.memory(0xFF, 2).is_empty());
        assert!(dev.memory(0x10, usize::MAX).is_empty());
    }

    #[test]
    fn full_event_log_is_flagged() {
        let mut bus = enabled_bus();
        for _ in 0..EVENT_CAPACITY {
            bus.trigger(Command::Start);
        }
        assert_eq!(bus.events().len(), EVENT_CAPACITY);
        assert!(!bus.overflowed());

        bus.trigger(Command::Stop);
        assert_eq!(bus.events().len(), EVENT_CAPACITY);
        assert!(bus.overflowed());
        assert_ne!(bus.events().last(), Some(&BusEvent::Stop));

        bus.clear_events();
        assert!(bus.events().is_empty());
        assert!(!bus.overflowed());
        bus.trigger(Command::Start);
        assert_eq!(bus.events(), [BusEvent::Start]);
    }

    #[test]
    fn attach_replaces_same_address() {
        let mut bus = enabled_bus();
        let mut first = SimPeripheral::new(0x20);
        first.load(0, &[1]);
        let mut second = SimPeripheral::new(0x20);
        second.load(0, &[2]);
        bus.attach(first);
        bus.attach(second);
        assert_eq!(bus.peripheral(0x20).unwrap().memory(0, 1), [2]);
    }
}
