// Licensed under the Apache-2.0 license

//! Bus controller setup helper
//!
//! Computes the bit-rate divider from the reference clock and the requested
//! bus speed, and performs the one-time controller initialization.

use fugit::HertzU32;

use crate::i2c::common::I2cConfig;
use crate::i2c::traits::I2cHardwareCore;

/// Largest value the divider register can hold.
pub const MAX_DIVIDER: u8 = u8::MAX;

/// Helper for bus controller initialization
pub struct BusSetup;

impl BusSetup {
    /// Divider giving `target` from `reference` with a prescaler of 1.
    ///
    /// `f_scl = f_ref / (16 + 2 * divider)`, so
    /// `divider = ((f_ref / f_scl) - 16) / 2`. Ratios below 16 saturate to 0
    /// (fastest rate the hardware can produce); larger results are clamped to
    /// [`MAX_DIVIDER`]. A zero target selects the slowest rate.
    #[must_use]
    pub fn bit_rate_divider(reference: HertzU32, target: HertzU32) -> u8 {
        let Some(ratio) = reference.raw().checked_div(target.raw()) else {
            return MAX_DIVIDER;
        };
        let divider = ratio.saturating_sub(16) / 2;
        u8::try_from(divider).unwrap_or(MAX_DIVIDER)
    }

    /// Bit rate produced by `divider` with a prescaler of 1.
    #[must_use]
    pub fn achieved_bit_rate(reference: HertzU32, divider: u8) -> HertzU32 {
        HertzU32::from_raw(reference.raw() / (16 + 2 * u32::from(divider)))
    }

    /// Program the divider, enable the controller, and return the bit rate
    /// actually achieved.
    pub fn initialize<H: I2cHardwareCore>(hardware: &mut H, config: &I2cConfig) -> HertzU32 {
        let divider = Self::bit_rate_divider(config.reference_clock, config.bit_rate);
        hardware.configure(divider);
        hardware.enable();
        Self::achieved_bit_rate(config.reference_clock, divider)
    }
}
