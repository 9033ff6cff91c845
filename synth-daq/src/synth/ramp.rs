//! Ramp parameters and their register encoding
//!
//! A ramp is specified by its sweep bandwidth and duration. The synthesizer
//! wants a step count (`length`, in phase detector ticks) and a per-step
//! change of the fractional numerator (`increment`, in units of
//! `f_pd / 2^24`).

use super::bits::BitField;
use crate::config::RampConfig;
use crate::error::{Error, Result};

/// Increment field width (signed)
pub const INCREMENT_WIDTH: u32 = 30;
/// Length field width
pub const LENGTH_WIDTH: u32 = 16;
/// Next/trigger/reset field width
pub const NEXT_TRIGGER_RESET_WIDTH: u32 = 8;
/// Fractional numerator field width
pub const FRAC_NUM_WIDTH: u32 = 24;
/// Fractional denominator, 2^24
pub const FRAC_DENOMINATOR: f64 = (1u32 << FRAC_NUM_WIDTH) as f64;

/// One ramp segment with its derived step parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub index: usize,
    pub reset: bool,
    pub next: u8,
    pub trigger: u8,
    pub flag: bool,
    pub doubler: bool,
    /// Sweep bandwidth, Hz
    pub bandwidth: f64,
    /// Duration, seconds
    pub duration: f64,
    increment: i64,
    length: u16,
}

impl Ramp {
    /// Build ramp `index` and derive its increment and length
    pub fn from_config(index: usize, config: &RampConfig, f_pd: f64) -> Result<Self> {
        let mut ramp = Self {
            index,
            reset: config.reset,
            next: config.next,
            trigger: config.trigger,
            flag: config.flag,
            doubler: config.doubler,
            bandwidth: config.bandwidth_hz,
            duration: config.duration_s,
            increment: 0,
            length: 0,
        };
        ramp.calculate(f_pd)?;
        Ok(ramp)
    }

    /// Recompute `length` and `increment` from bandwidth and duration
    pub fn calculate(&mut self, f_pd: f64) -> Result<()> {
        if !(f_pd > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "phase detector frequency {} Hz",
                f_pd
            )));
        }

        // The doubler makes every step last two ticks
        let ticks = self.duration * f_pd / if self.doubler { 2.0 } else { 1.0 };
        let length = ticks.round();
        if !(length >= 1.0 && length <= u16::MAX as f64) {
            return Err(Error::InvalidParameter(format!(
                "ramp {}: {} s gives a length of {} steps (1..=65535)",
                self.index, self.duration, length
            )));
        }

        let increment = (self.bandwidth * FRAC_DENOMINATOR / (f_pd * length)).round();
        let limit = (1i64 << (INCREMENT_WIDTH - 1)) as f64;
        if !(increment >= -limit && increment < limit) {
            return Err(Error::InvalidParameter(format!(
                "ramp {}: {} Hz over {} steps needs increment {}",
                self.index, self.bandwidth, length, increment
            )));
        }

        self.length = length as u16;
        self.increment = increment as i64;
        Ok(())
    }

    /// Signed step per tick in fractional-numerator units
    #[inline]
    pub fn increment(&self) -> i64 {
        self.increment
    }

    /// Step count
    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// `next[7:5] | reset[4] | trigger[3:2]`
    pub fn next_trigger_reset(&self) -> u8 {
        ((self.next & 0x07) << 5) | ((self.reset as u8) << 4) | ((self.trigger & 0x03) << 2)
    }

    /// Produce the register fields of this ramp
    pub fn encode(&self) -> Result<RampFields> {
        Ok(RampFields {
            increment: BitField::signed("increment", self.increment, INCREMENT_WIDTH)?,
            length: BitField::unsigned("length", self.length as u64, LENGTH_WIDTH)?,
            next_trigger_reset: BitField::unsigned(
                "next_trigger_reset",
                self.next_trigger_reset() as u64,
                NEXT_TRIGGER_RESET_WIDTH,
            )?,
            flag: BitField::flag(self.flag),
            doubler: BitField::flag(self.doubler),
        })
    }

    /// Bandwidth actually produced after rounding
    pub fn programmed_bandwidth(&self, f_pd: f64) -> f64 {
        bnw_out(f_pd, self.increment, self.length)
    }
}

/// Encoded fields of one ramp, ready for insertion
///
/// Only `Ramp::encode` creates these, so the bits always match the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampFields {
    increment: BitField,
    length: BitField,
    next_trigger_reset: BitField,
    flag: BitField,
    doubler: BitField,
}

impl RampFields {
    /// Field names paired with their values, as named in the register layout
    pub fn named(&self) -> [(&'static str, BitField); 5] {
        [
            ("increment", self.increment),
            ("flag", self.flag),
            ("doubler", self.doubler),
            ("length", self.length),
            ("next_trigger_reset", self.next_trigger_reset),
        ]
    }

    pub fn increment(&self) -> BitField {
        self.increment
    }

    pub fn length(&self) -> BitField {
        self.length
    }

    pub fn next_trigger_reset(&self) -> BitField {
        self.next_trigger_reset
    }
}

/// VCO output frequency for fractional numerator `frac_num`
pub fn vco_out(f_pd: f64, integer_n: u32, frac_num: u32) -> f64 {
    f_pd * (integer_n as f64 + frac_num as f64 / FRAC_DENOMINATOR)
}

/// Sweep bandwidth of `length` steps of `increment`
pub fn bnw_out(f_pd: f64, increment: i64, length: u16) -> f64 {
    increment as f64 * length as f64 * f_pd / FRAC_DENOMINATOR
}
