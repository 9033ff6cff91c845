//! Width-tagged register fields
//!
//! A `BitField` carries its value together with the number of bits it
//! occupies in the synthesizer registers. Signed fields are stored in two's
//! complement of their own width, so a 30-bit increment of -1 is
//! `0x3FFF_FFFF`, not a 64-bit pattern.

use crate::error::{Error, Result};

/// Widest field supported
pub const MAX_WIDTH: u32 = 32;

/// Fixed-width register field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    raw: u32,
    width: u32,
    signed: bool,
}

impl BitField {
    /// Unsigned field; fails when `value` needs more than `width` bits
    pub fn unsigned(name: &str, value: u64, width: u32) -> Result<Self> {
        check_width(width)?;
        if value > mask(width) as u64 {
            return Err(Error::InvalidParameter(format!(
                "{} = {} does not fit in {} bits",
                name, value, width
            )));
        }
        Ok(Self {
            raw: value as u32,
            width,
            signed: false,
        })
    }

    /// Signed (two's complement) field; fails outside
    /// `-2^(width-1) ..= 2^(width-1) - 1`
    pub fn signed(name: &str, value: i64, width: u32) -> Result<Self> {
        check_width(width)?;
        let min = -(1i64 << (width - 1));
        let max = (1i64 << (width - 1)) - 1;
        if value < min || value > max {
            return Err(Error::InvalidParameter(format!(
                "{} = {} outside the signed {}-bit range {}..={}",
                name, value, width, min, max
            )));
        }
        Ok(Self {
            raw: (value as u64 & mask(width) as u64) as u32,
            width,
            signed: true,
        })
    }

    /// Single-bit flag
    pub fn flag(set: bool) -> Self {
        Self {
            raw: set as u32,
            width: 1,
            signed: false,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Bit pattern as stored in the registers
    #[inline]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Numeric value (sign-extended for signed fields)
    pub fn value(&self) -> i64 {
        if self.signed && (self.raw >> (self.width - 1)) & 1 == 1 {
            self.raw as i64 - (1i64 << self.width)
        } else {
            self.raw as i64
        }
    }

    /// Bits `lsb .. lsb + count` of the pattern, right-aligned
    #[inline]
    pub fn bits_at(&self, lsb: u32, count: u32) -> u32 {
        (self.raw >> lsb) & mask(count)
    }

    /// MSB-first bit array, zero-padded to the field width
    pub fn to_bits(&self) -> Vec<u8> {
        let mut bits = vec![0u8; self.width as usize];
        let mut remaining = self.raw;
        for bit in bits.iter_mut().rev() {
            *bit = (remaining % 2) as u8;
            remaining /= 2;
        }
        bits
    }

    /// Inverse of `to_bits`; the width is the length of `bits`
    pub fn from_bits(bits: &[u8], signed: bool) -> Result<Self> {
        let width = bits.len() as u32;
        check_width(width)?;
        let mut raw = 0u32;
        for &bit in bits {
            if bit > 1 {
                return Err(Error::InvalidParameter(format!("bit value {}", bit)));
            }
            raw = raw * 2 + bit as u32;
        }
        Ok(Self { raw, width, signed })
    }
}

impl std::fmt::Display for BitField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.to_bits() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

#[inline]
fn mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

fn check_width(width: u32) -> Result<()> {
    if width == 0 || width > MAX_WIDTH {
        return Err(Error::InvalidParameter(format!(
            "field width {} outside 1..={}",
            width, MAX_WIDTH
        )));
    }
    Ok(())
}
