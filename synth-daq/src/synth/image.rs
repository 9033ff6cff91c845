//! Register image of one synthesizer
//!
//! Holds the exact byte written to every register. The image is seeded from
//! the template, completed with the encoded ramps and the fractional
//! numerator, and then only the ramp control register changes.

use super::bits::BitField;
use super::layout::{
    FieldLayout, RegisterLayout, Slice, FRAC_NUM_LAYOUT, NUM_REGISTERS, RAMP_CONTROL_REGISTER,
    RAMP_DISABLE, RAMP_ENABLE, RAMP_LAYOUT,
};
use super::ramp::RampFields;
use crate::config::MAX_RAMPS;
use crate::error::{Error, Result};

/// Register file contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterImage {
    registers: [u8; NUM_REGISTERS],
}

impl RegisterImage {
    /// All-zero image
    pub fn new() -> Self {
        Self {
            registers: [0u8; NUM_REGISTERS],
        }
    }

    pub fn get(&self, address: usize) -> Option<u8> {
        self.registers.get(address).copied()
    }

    pub fn set(&mut self, address: usize, value: u8) -> Result<()> {
        let slot = self.registers.get_mut(address).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "register {} outside 0..{}",
                address, NUM_REGISTERS
            ))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    /// `(address, value)` pairs in the order they are shifted out,
    /// highest address first
    pub fn write_order(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.registers.iter().copied().enumerate().rev()
    }

    /// Write `value` into the register bits allocated by `layout`,
    /// addresses relative to `base`
    pub fn insert_field(
        &mut self,
        layout: &FieldLayout,
        base: usize,
        value: &BitField,
    ) -> Result<()> {
        let capacity = layout.capacity();
        if value.width() > capacity {
            return Err(Error::EncodingOverflow {
                field: layout.name,
                width: value.width(),
                capacity,
            });
        }

        for slice in layout.slices {
            let bits = if slice.field_lsb < value.width() {
                value.bits_at(slice.field_lsb, slice.width) as u8
            } else {
                0
            };
            let address = base + slice.register;
            let current = self.get(address).ok_or_else(|| {
                Error::InvalidParameter(format!("{} maps to register {}", layout.name, address))
            })?;
            let mask = slice_mask(slice);
            self.set(address, (current & !mask) | ((bits << slice.register_lsb) & mask))?;
        }
        Ok(())
    }

    /// Read back the bits allocated by `layout`
    pub fn extract_field(&self, layout: &FieldLayout, base: usize) -> Result<u32> {
        let mut raw = 0u32;
        for slice in layout.slices {
            let address = base + slice.register;
            let current = self.get(address).ok_or_else(|| {
                Error::InvalidParameter(format!("{} maps to register {}", layout.name, address))
            })?;
            let bits = (current & slice_mask(slice)) >> slice.register_lsb;
            raw |= (bits as u32) << slice.field_lsb;
        }
        Ok(raw)
    }

    /// Write every field of ramp `ramp_index` into its register block
    pub fn insert(&mut self, ramp_index: usize, fields: &RampFields) -> Result<()> {
        self.insert_with(&RAMP_LAYOUT, ramp_index, fields)
    }

    /// `insert` against an explicit layout
    pub fn insert_with(
        &mut self,
        layout: &RegisterLayout,
        ramp_index: usize,
        fields: &RampFields,
    ) -> Result<()> {
        if ramp_index >= MAX_RAMPS {
            return Err(Error::InvalidParameter(format!(
                "ramp index {} outside 0..{}",
                ramp_index, MAX_RAMPS
            )));
        }
        let base = layout.block_base(ramp_index);
        for (name, value) in fields.named() {
            let field = layout.field(name).ok_or_else(|| {
                Error::InvalidParameter(format!("layout has no field {}", name))
            })?;
            self.insert_field(field, base, &value)?;
        }
        Ok(())
    }

    /// Write the 24-bit fractional numerator
    pub fn insert_frac_num(&mut self, frac_num: &BitField) -> Result<()> {
        self.insert_field(&FRAC_NUM_LAYOUT, 0, frac_num)
    }

    /// Set or clear RAMP_EN; returns the new control register value
    pub fn set_ramp_enable(&mut self, enabled: bool) -> u8 {
        let value = if enabled { RAMP_ENABLE } else { RAMP_DISABLE };
        self.registers[RAMP_CONTROL_REGISTER] = value;
        value
    }
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

fn slice_mask(slice: &Slice) -> u8 {
    (((1u16 << slice.width) - 1) << slice.register_lsb) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RampConfig;
    use crate::synth::ramp::Ramp;

    fn encoded(bandwidth_hz: f64, next: u8) -> RampFields {
        let config = RampConfig {
            bandwidth_hz,
            duration_s: 500e-6,
            next,
            trigger: 1,
            reset: true,
            flag: true,
            doubler: false,
        };
        Ramp::from_config(0, &config, 100e6).unwrap().encode().unwrap()
    }

    #[test]
    fn test_insert_ramp_block() {
        let mut image = RegisterImage::new();
        image.insert(1, &encoded(150e6, 2)).unwrap();

        // increment 503 = 0x1F7, length 50000 = 0xC350
        let base = 86 + 7;
        assert_eq!(image.get(base), Some(0xF7));
        assert_eq!(image.get(base + 1), Some(0x01));
        assert_eq!(image.get(base + 2), Some(0x00));
        assert_eq!(image.get(base + 3), Some(0b0100_0000)); // flag set
        assert_eq!(image.get(base + 4), Some(0x50));
        assert_eq!(image.get(base + 5), Some(0xC3));
        assert_eq!(image.get(base + 6), Some(0b0101_0100));
        // ramp 0 untouched
        assert!(image.registers()[86..93].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_negative_increment_fills_top_bits() {
        let mut image = RegisterImage::new();
        image.insert(0, &encoded(-150e6, 0)).unwrap();
        // -503 in 30 bits: 0x3FFFFE09
        assert_eq!(image.get(86), Some(0x09));
        assert_eq!(image.get(87), Some(0xFE));
        assert_eq!(image.get(88), Some(0xFF));
        assert_eq!(image.get(89), Some(0b0111_1111));
        let raw = image
            .extract_field(RAMP_LAYOUT.field("increment").unwrap(), 86)
            .unwrap();
        assert_eq!(raw, 0x3FFF_FE09);
    }

    #[test]
    fn test_field_wider_than_slices_overflows() {
        let mut image = RegisterImage::new();
        let wide = BitField::unsigned("frac", 1 << 24, 25).unwrap();
        assert!(matches!(
            image.insert_frac_num(&wide),
            Err(Error::EncodingOverflow {
                field: "frac_num",
                width: 25,
                capacity: 24
            })
        ));
    }

    #[test]
    fn test_insert_preserves_unrelated_bits() {
        let mut image = RegisterImage::new();
        image.set(89, 0xFF).unwrap();
        image.insert(0, &encoded(150e6, 0)).unwrap();
        // increment top bits are zero, flag set, doubler clear
        assert_eq!(image.get(89), Some(0b0100_0000));
        image.set(20, 0xAA).unwrap();
        image
            .insert_frac_num(&BitField::unsigned("frac_num", 0x12_3456, 24).unwrap())
            .unwrap();
        assert_eq!(&image.registers()[19..22], &[0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_ramp_index_bounds() {
        let mut image = RegisterImage::new();
        assert!(image.insert(8, &encoded(1e6, 0)).is_err());
        assert!(image.insert(7, &encoded(1e6, 0)).is_ok());
    }

    #[test]
    fn test_ramp_enable_and_write_order() {
        let mut image = RegisterImage::new();
        assert_eq!(image.set_ramp_enable(true), 0b0010_0001);
        assert_eq!(image.get(58), Some(0b0010_0001));
        image.set_ramp_enable(false);
        assert_eq!(image.get(58), Some(0b0010_0000));

        let order: Vec<usize> = image.write_order().map(|(a, _)| a).collect();
        assert_eq!(order.first(), Some(&141));
        assert_eq!(order.last(), Some(&0));
    }
}
