// Licensed under the Apache-2.0 license

//! Polled TWI (two-wire, I2C-compatible) bus master.
//!
//! Layering, bottom-up:
//!
//! - [`traits`]: register-level seam, with [`atmega_twi`] and [`sim`] backends
//! - [`status`] and [`timeout`]: status decoding and bounded polling
//! - [`transaction`]: single protocol steps (start, address, byte, stop)
//! - [`transfer`]: whole burst and register transfers
//! - [`i2c_controller`]: the owning handle and the `embedded-hal` adapter

pub mod atmega_twi;
pub mod common;
pub mod error;
pub mod i2c_controller;
pub mod sim;
pub mod status;
pub mod system_setup;
pub mod timeout;
pub mod traits;
pub mod transaction;
pub mod transfer;

pub use atmega_twi::Atmega328pTwi;
pub use common::{Address, Command, Direction, I2cConfig, I2cConfigBuilder, I2cSpeed};
pub use error::{Error, Fault, NackSource};
pub use i2c_controller::I2cController;
pub use sim::{BusEvent, Injection, SimPeripheral, SimulatedBus};
pub use system_setup::BusSetup;
pub use traits::I2cHardwareCore;
pub use transaction::{BusState, StopCondition};
